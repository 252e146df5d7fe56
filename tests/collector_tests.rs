//! End-to-end collection tests against a mock wiki

use serde_json::json;
use std::sync::Arc;
use wikivault::config::HttpConfig;
use wikivault::mediawiki::MediaWikiClient;
use wikivault::storage::{shared, Repository, SharedRepository, SqliteRepository};
use wikivault::{CollectOutcome, Collector, SiteStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collector(repo: SharedRepository<SqliteRepository>) -> Collector<SqliteRepository> {
    let mediawiki = Arc::new(
        MediaWikiClient::new(&HttpConfig {
            timeout_secs: 5,
            ..HttpConfig::default()
        })
        .unwrap(),
    );
    Collector::new(repo, mediawiki)
}

fn siteinfo_body() -> serde_json::Value {
    json!({
        "query": {
            "general": {
                "sitename": "Test Wiki",
                "lang": "en",
                "dbtype": "mysql",
                "dbversion": "8.0.32",
                "generator": "MediaWiki 1.39.4",
                "maxpageid": 4200
            },
            "statistics": {
                "pages": 1500,
                "articles": "420",
                "edits": 99999,
                "images": 12,
                "users": 55,
                "activeusers": 3,
                "admins": 2,
                "jobs": 0
            }
        }
    })
}

async fn mount_api(server: &MockServer, api_path: &str) {
    Mock::given(method("GET"))
        .and(path(api_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(siteinfo_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn collects_metadata_and_one_snapshot() {
    let server = MockServer::start().await;
    mount_api(&server, "/wiki/api.php").await;

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let site = {
        let mut repo = repo.lock().await;
        repo.create_site(&server.uri()).unwrap()
    };

    let outcome = collector(repo.clone()).collect_one(site.id).await.unwrap();
    assert_eq!(outcome, CollectOutcome::Collected);

    let repo = repo.lock().await;
    let site = repo.get_site(site.id).unwrap();
    assert_eq!(
        site.api_url,
        Some(format!("{}/wiki/api.php", server.uri())),
        "third candidate layout must be detected"
    );
    assert_eq!(
        site.index_url,
        Some(format!("{}/wiki/index.php", server.uri()))
    );
    assert_eq!(site.status, SiteStatus::Ok);
    assert!(site.api_available);
    assert_eq!(site.sitename.as_deref(), Some("Test Wiki"));
    assert_eq!(site.engine_version.as_deref(), Some("MediaWiki 1.39.4"));
    assert_eq!(site.max_page_id, Some(4200));
    assert!(site.last_check_at.is_some());
    assert!(site.last_error.is_none());

    assert_eq!(repo.count_snapshots(site.id).unwrap(), 1);
    let snapshot = repo.latest_snapshot(site.id).unwrap().unwrap();
    assert_eq!(snapshot.pages, 1500);
    assert_eq!(snapshot.articles, 420, "string counts must be parsed");
    assert_eq!(snapshot.http_status, Some(200));
    assert!(snapshot.response_time_ms.is_some());
}

#[tokio::test]
async fn failure_records_error_and_no_snapshot() {
    let server = MockServer::start().await;
    // No API mounted anywhere

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let site = {
        let mut repo = repo.lock().await;
        repo.create_site(&server.uri()).unwrap()
    };

    let result = collector(repo.clone()).collect_one(site.id).await;
    assert!(result.is_err());

    let repo = repo.lock().await;
    let site = repo.get_site(site.id).unwrap();
    assert_eq!(site.status, SiteStatus::Error);
    assert!(!site.api_available);
    assert!(site.last_error.is_some());
    assert!(site.last_error_at.is_some());
    assert!(site.last_check_at.is_some());
    assert_eq!(repo.count_snapshots(site.id).unwrap(), 0);
}

#[tokio::test]
async fn cached_endpoint_skips_detection() {
    let server = MockServer::start().await;
    mount_api(&server, "/w/api.php").await;

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let site = {
        let mut repo = repo.lock().await;
        // The recorded base URL is dead; only the cached endpoint works
        let mut site = repo.create_site("http://gone.invalid").unwrap();
        site.api_url = Some(format!("{}/w/api.php", server.uri()));
        site.index_url = Some(format!("{}/w/index.php", server.uri()));
        repo.update_site(&site).unwrap();
        site
    };

    let outcome = collector(repo.clone()).collect_one(site.id).await.unwrap();
    assert_eq!(outcome, CollectOutcome::Collected);

    let repo = repo.lock().await;
    assert_eq!(repo.count_snapshots(site.id).unwrap(), 1);
}

#[tokio::test]
async fn success_clears_previous_error() {
    let server = MockServer::start().await;
    mount_api(&server, "/w/api.php").await;

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let site = {
        let mut repo = repo.lock().await;
        let mut site = repo.create_site(&server.uri()).unwrap();
        site.status = SiteStatus::Error;
        site.last_error = Some("siteinfo fetch failed".to_string());
        site.last_error_at = Some(chrono::Utc::now());
        repo.update_site(&site).unwrap();
        site
    };

    collector(repo.clone()).collect_one(site.id).await.unwrap();

    let repo = repo.lock().await;
    let site = repo.get_site(site.id).unwrap();
    assert_eq!(site.status, SiteStatus::Ok);
    assert!(site.last_error.is_none());
    assert!(site.last_error_at.is_none());
}

#[tokio::test]
async fn newer_duplicate_is_removed() {
    let server = MockServer::start().await;
    mount_api(&server, "/w/api.php").await;
    let api_url = format!("{}/w/api.php", server.uri());
    let index_url = format!("{}/w/index.php", server.uri());

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let (older, newer) = {
        let mut repo = repo.lock().await;
        let mut older = repo.create_site(&server.uri()).unwrap();
        older.api_url = Some(api_url.clone());
        older.index_url = Some(index_url.clone());
        repo.update_site(&older).unwrap();

        // A second registration of the same wiki under another name
        let mut newer = repo.create_site("https://mirror.example.org").unwrap();
        newer.api_url = Some(api_url.clone());
        newer.index_url = Some(index_url.clone());
        repo.update_site(&newer).unwrap();
        (older, newer)
    };

    let outcome = collector(repo.clone()).collect_one(newer.id).await.unwrap();
    assert_eq!(outcome, CollectOutcome::RemovedAsDuplicate);

    let repo = repo.lock().await;
    assert!(repo.get_site(newer.id).is_err(), "duplicate must be deleted");
    assert!(repo.get_site(older.id).is_ok());
    assert_eq!(repo.count_snapshots(newer.id).unwrap(), 0);
}

#[tokio::test]
async fn collecting_the_older_site_removes_newer_duplicate() {
    let server = MockServer::start().await;
    mount_api(&server, "/w/api.php").await;
    let api_url = format!("{}/w/api.php", server.uri());
    let index_url = format!("{}/w/index.php", server.uri());

    let repo = shared(SqliteRepository::new_in_memory().unwrap());
    let (older, newer) = {
        let mut repo = repo.lock().await;
        let mut older = repo.create_site(&server.uri()).unwrap();
        older.api_url = Some(api_url.clone());
        older.index_url = Some(index_url.clone());
        repo.update_site(&older).unwrap();

        let mut newer = repo.create_site("https://mirror.example.org").unwrap();
        newer.api_url = Some(api_url.clone());
        newer.index_url = Some(index_url.clone());
        repo.update_site(&newer).unwrap();
        (older, newer)
    };

    let outcome = collector(repo.clone()).collect_one(older.id).await.unwrap();
    assert_eq!(outcome, CollectOutcome::Collected);

    let repo = repo.lock().await;
    assert!(repo.get_site(older.id).is_ok());
    assert!(repo.get_site(newer.id).is_err());
    assert_eq!(repo.count_snapshots(older.id).unwrap(), 1);
}
