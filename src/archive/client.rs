//! Archive.org HTTP client

use crate::archive::size::parse_size;
use crate::archive::ArchiveError;
use crate::config::HttpConfig;
use crate::models::DumpContents;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

/// One matching backup item, fully resolved through the metadata API
#[derive(Debug, Clone)]
pub struct ArchiveHit {
    pub identifier: String,
    pub added_date: Option<DateTime<Utc>>,
    pub dump_date: Option<DateTime<Utc>>,
    pub item_size: Option<i64>,
    pub uploader: Option<String>,
    pub scanner: Option<String>,
    pub upload_state: Option<String>,
    pub contents: DumpContents,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
    #[serde(rename = "numFound", default)]
    num_found: i64,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: String,
    #[serde(default)]
    addeddate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    metadata: ItemMetadata,
    #[serde(default)]
    files: Vec<ItemFile>,
    #[serde(default)]
    item_size: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemMetadata {
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    scanner: Option<String>,
    #[serde(rename = "upload-state", default)]
    upload_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemFile {
    #[serde(default)]
    name: String,
}

/// Client for the archive.org search and metadata APIs
///
/// The endpoint base is configurable so tests can point it at a mock
/// server.
pub struct ArchiveClient {
    http: Client,
    endpoint: String,
}

impl ArchiveClient {
    /// Builds a client from the HTTP configuration and an endpoint base URL
    pub fn new(config: &HttpConfig, endpoint: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Searches for backup items of a wiki and resolves their metadata
    ///
    /// When no index URL is known, one is derived from the API URL by
    /// substituting `index.php` for `api.php`. Items whose metadata fetch
    /// fails are skipped.
    pub async fn find_backups(
        &self,
        api_url: &str,
        index_url: Option<&str>,
    ) -> Result<Vec<ArchiveHit>, ArchiveError> {
        let derived_index = api_url.replacen("api.php", "index.php", 1);
        let index_url = index_url.unwrap_or(&derived_index);

        let docs = self.search(api_url, index_url).await?;

        let mut hits = Vec::with_capacity(docs.len());
        for doc in docs {
            match self.resolve_item(&doc).await {
                Ok(hit) => hits.push(hit),
                Err(e) => {
                    tracing::warn!(identifier = %doc.identifier, error = %e, "skipping archive item");
                }
            }
        }

        Ok(hits)
    }

    async fn search(&self, api_url: &str, index_url: &str) -> Result<Vec<SearchDoc>, ArchiveError> {
        // Uploads record whichever scheme the uploader happened to use, so
        // both variants of both URLs are matched
        let query = format!(
            r#"(originalurl:"{}" OR originalurl:"{}" OR originalurl:"{}" OR originalurl:"{}")"#,
            scheme_variant(api_url, "http"),
            scheme_variant(api_url, "https"),
            scheme_variant(index_url, "http"),
            scheme_variant(index_url, "https"),
        );

        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let search_url = format!(
            "{}/advancedsearch.php?q={}&fl[]=identifier&fl[]=addeddate&fl[]=originalurl&sort[]=addeddate+desc&rows[]=100&output=json",
            self.endpoint, encoded
        );

        let response =
            self.http
                .get(&search_url)
                .send()
                .await
                .map_err(|e| ArchiveError::Transport {
                    url: search_url.clone(),
                    source: e,
                })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ArchiveError::Status {
                url: search_url,
                status,
            });
        }

        let result: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| ArchiveError::InvalidResponse {
                    url: search_url.clone(),
                    message: e.to_string(),
                })?;

        tracing::debug!(num_found = result.response.num_found, "archive search done");
        Ok(result.response.docs)
    }

    async fn resolve_item(&self, doc: &SearchDoc) -> Result<ArchiveHit, ArchiveError> {
        let metadata_url = format!("{}/metadata/{}", self.endpoint, doc.identifier);

        let response =
            self.http
                .get(&metadata_url)
                .send()
                .await
                .map_err(|e| ArchiveError::Transport {
                    url: metadata_url.clone(),
                    source: e,
                })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ArchiveError::Status {
                url: metadata_url,
                status,
            });
        }

        let metadata: MetadataResponse =
            response
                .json()
                .await
                .map_err(|e| ArchiveError::InvalidResponse {
                    url: metadata_url.clone(),
                    message: e.to_string(),
                })?;

        let added_date = doc.addeddate.as_deref().and_then(parse_added_date);
        let dump_date = dump_date_from_identifier(&doc.identifier).or(added_date);

        let item_size = metadata.item_size.as_ref().and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => parse_size(s),
            _ => None,
        });

        let file_names: Vec<&str> = metadata.files.iter().map(|f| f.name.as_str()).collect();

        Ok(ArchiveHit {
            identifier: doc.identifier.clone(),
            added_date,
            dump_date,
            item_size,
            uploader: metadata.metadata.uploader.filter(|s| !s.is_empty()),
            scanner: metadata.metadata.scanner.filter(|s| !s.is_empty()),
            upload_state: metadata.metadata.upload_state.filter(|s| !s.is_empty()),
            contents: classify_files(&file_names),
        })
    }
}

fn scheme_variant(url: &str, scheme: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("{scheme}://{rest}")
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("{scheme}://{rest}")
    } else {
        url.to_string()
    }
}

/// Parses the `addeddate` field, which archive.org emits in several
/// formats depending on item age
fn parse_added_date(value: &str) -> Option<DateTime<Utc>> {
    for format in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Extracts the dump date from identifiers ending in `-YYYYMMDD`
fn dump_date_from_identifier(identifier: &str) -> Option<DateTime<Utc>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"-(\d{8})$").unwrap());

    let digits = pattern.captures(identifier)?.get(1)?.as_str();
    let date = NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Classifies file names inside an item into dump content flags
pub fn classify_files(names: &[&str]) -> DumpContents {
    let mut contents = DumpContents::default();

    for name in names {
        let name = name.to_lowercase();

        if name.contains("-current.xml") {
            contents.has_xml_current = true;
        } else if name.contains("-history.xml") {
            contents.has_xml_history = true;
        } else if name.contains("-images.7z") || name.contains("-images.tar") {
            contents.has_images_dump = true;
        } else if name.contains("-titles.txt") || name.contains("-titles.xml") {
            contents.has_titles_list = true;
        } else if name.contains("-images.txt") || name.contains("-images.xml") {
            contents.has_images_list = true;
        } else if name.contains("-wikidump.7z") || name.contains("-wikidump.tar") {
            contents.has_legacy_dump = true;
        }
    }

    contents
}
