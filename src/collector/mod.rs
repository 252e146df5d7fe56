//! Statistics collection
//!
//! One collection visits a site, resolves its API endpoint if needed,
//! fetches siteinfo, reconciles duplicate registrations and appends
//! exactly one statistics snapshot.

pub mod reconciler;

use crate::mediawiki::{MediaWikiClient, ResolvedEndpoint, SiteInfo};
use crate::models::{SiteStatus, StatSnapshot};
use crate::storage::{Repository, SharedRepository, StorageError};
use chrono::Utc;
use std::sync::Arc;

/// How a collection run ended for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Metadata updated and a snapshot recorded
    Collected,
    /// The site turned out to duplicate an older registration and was
    /// deleted instead
    RemovedAsDuplicate,
}

/// Collects statistics for tracked sites
pub struct Collector<R: Repository> {
    repo: SharedRepository<R>,
    mediawiki: Arc<MediaWikiClient>,
}

impl<R: Repository> Collector<R> {
    pub fn new(repo: SharedRepository<R>, mediawiki: Arc<MediaWikiClient>) -> Self {
        Self { repo, mediawiki }
    }

    /// Runs one collection for a site
    ///
    /// A cached endpoint is tried first; if it stops answering, detection
    /// runs again from the site URL. Failures are persisted on the site
    /// (status, error message, check timestamp) and no snapshot is
    /// written for them.
    pub async fn collect_one(&self, site_id: i64) -> crate::Result<CollectOutcome> {
        let site = {
            let repo = self.repo.lock().await;
            repo.get_site(site_id)?
        };

        tracing::info!(site_id, url = %site.url, "collecting");

        let (endpoint, siteinfo) = match (&site.api_url, &site.index_url) {
            (Some(api_url), Some(index_url)) => {
                // Cheap path: reuse the cached endpoint
                match self.mediawiki.fetch_siteinfo(api_url).await {
                    Ok(siteinfo) => (
                        ResolvedEndpoint {
                            api_url: api_url.clone(),
                            index_url: index_url.clone(),
                            upgraded: false,
                        },
                        siteinfo,
                    ),
                    Err(e) => {
                        tracing::info!(site_id, error = %e, "cached endpoint failed, re-detecting");
                        self.detect_and_fetch(site_id, &site.url).await?
                    }
                }
            }
            _ => self.detect_and_fetch(site_id, &site.url).await?,
        };

        let mut repo = self.repo.lock().await;

        if reconciler::resolve_duplicate(&mut *repo, &site, &endpoint.api_url)? {
            tracing::warn!(site_id, api_url = %endpoint.api_url, "removing site as duplicate");
            repo.delete_site(site_id)?;
            return Ok(CollectOutcome::RemovedAsDuplicate);
        }

        let now = Utc::now();
        let mut site = repo.get_site(site_id)?;
        site.sitename = siteinfo.general.sitename.clone();
        site.lang = siteinfo.general.lang.clone();
        site.dbtype = siteinfo.general.dbtype.clone();
        site.dbversion = siteinfo.general.dbversion.clone();
        site.engine_version = siteinfo.general.generator.clone();
        site.max_page_id = siteinfo.general.max_page_id;
        site.api_url = Some(endpoint.api_url.clone());
        site.index_url = Some(endpoint.index_url.clone());
        site.api_available = true;
        site.status = SiteStatus::Ok;
        site.last_check_at = Some(now);
        site.last_error = None;
        site.last_error_at = None;
        repo.update_site(&site)?;

        repo.create_snapshot(&snapshot_from(site_id, &siteinfo))?;

        tracing::info!(
            site_id,
            pages = siteinfo.statistics.pages,
            edits = siteinfo.statistics.edits,
            "collection done"
        );

        Ok(CollectOutcome::Collected)
    }

    async fn detect_and_fetch(
        &self,
        site_id: i64,
        site_url: &str,
    ) -> crate::Result<(ResolvedEndpoint, SiteInfo)> {
        let endpoint = match self.mediawiki.resolve(site_url).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.record_failure(site_id, &e.to_string()).await?;
                return Err(e.into());
            }
        };

        match self.mediawiki.fetch_siteinfo(&endpoint.api_url).await {
            Ok(siteinfo) => Ok((endpoint, siteinfo)),
            Err(e) => {
                self.record_failure(site_id, &e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    /// Persists a failed collection on the site
    async fn record_failure(&self, site_id: i64, message: &str) -> Result<(), StorageError> {
        let mut repo = self.repo.lock().await;
        let mut site = repo.get_site(site_id)?;

        let now = Utc::now();
        site.status = SiteStatus::Error;
        site.last_error = Some(message.to_string());
        site.last_error_at = Some(now);
        site.last_check_at = Some(now);
        site.api_available = false;
        repo.update_site(&site)
    }
}

fn snapshot_from(site_id: i64, siteinfo: &SiteInfo) -> StatSnapshot {
    StatSnapshot {
        id: 0,
        site_id,
        observed_at: Utc::now(),
        pages: siteinfo.statistics.pages,
        articles: siteinfo.statistics.articles,
        edits: siteinfo.statistics.edits,
        images: siteinfo.statistics.images,
        users: siteinfo.statistics.users,
        active_users: siteinfo.statistics.active_users,
        admins: siteinfo.statistics.admins,
        jobs: siteinfo.statistics.jobs,
        response_time_ms: Some(siteinfo.response_time_ms),
        http_status: Some(siteinfo.http_status as i64),
    }
}
