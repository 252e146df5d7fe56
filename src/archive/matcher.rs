//! Reconciles archive.org search results into the archive-record store

use crate::archive::{ArchiveClient, ArchiveError, ArchiveHit};
use crate::models::ArchiveRecord;
use crate::storage::{Repository, SharedRepository, StorageError, UpsertOutcome};
use chrono::Utc;
use std::sync::Arc;

/// Counters from one archive check of a site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Matching items returned by the search
    pub found: usize,
    /// Items stored for the first time
    pub imported: usize,
    /// Items already known and refreshed in place
    pub updated: usize,
}

/// Ties the archive client to the repository
pub struct ArchiveMatcher<R: Repository> {
    repo: SharedRepository<R>,
    client: Arc<ArchiveClient>,
}

impl<R: Repository> ArchiveMatcher<R> {
    pub fn new(repo: SharedRepository<R>, client: Arc<ArchiveClient>) -> Self {
        Self { repo, client }
    }

    /// Runs one archive check for a site
    ///
    /// On success every matching item is upserted, `has_archive` reflects
    /// whether anything was found, the check timestamp advances and any
    /// previous archive error is cleared. A failed search propagates
    /// without touching the site; the caller records it via
    /// [`record_archive_error`](Self::record_archive_error).
    pub async fn collect_archives(&self, site_id: i64) -> crate::Result<ArchiveReport> {
        let (api_url, index_url) = {
            let repo = self.repo.lock().await;
            let site = repo.get_site(site_id)?;
            match site.api_url {
                Some(api_url) => (api_url, site.index_url),
                None => return Err(ArchiveError::MissingApiUrl { site_id }.into()),
            }
        };

        let hits = self
            .client
            .find_backups(&api_url, index_url.as_deref())
            .await?;

        let mut report = ArchiveReport {
            found: hits.len(),
            ..Default::default()
        };

        let mut repo = self.repo.lock().await;
        for hit in &hits {
            match repo.upsert_archive_record(&to_record(site_id, hit))? {
                UpsertOutcome::Inserted => report.imported += 1,
                UpsertOutcome::Updated => report.updated += 1,
            }
        }

        let mut site = repo.get_site(site_id)?;
        site.has_archive = report.found > 0;
        site.archive_last_check_at = Some(Utc::now());
        site.archive_last_error = None;
        site.archive_last_error_at = None;
        repo.update_site(&site)?;

        tracing::info!(
            site_id,
            found = report.found,
            imported = report.imported,
            updated = report.updated,
            "archive check done"
        );

        Ok(report)
    }

    /// Records a failed archive check on the site
    ///
    /// The check timestamp still advances so the scheduler does not retry
    /// the same broken site immediately; `has_archive` is left as-is.
    pub async fn record_archive_error(
        &self,
        site_id: i64,
        message: &str,
    ) -> Result<(), StorageError> {
        let mut repo = self.repo.lock().await;
        let mut site = repo.get_site(site_id)?;

        let now = Utc::now();
        site.archive_last_error = Some(message.to_string());
        site.archive_last_error_at = Some(now);
        site.archive_last_check_at = Some(now);
        repo.update_site(&site)
    }
}

fn to_record(site_id: i64, hit: &ArchiveHit) -> ArchiveRecord {
    ArchiveRecord {
        id: 0,
        site_id,
        ia_identifier: hit.identifier.clone(),
        added_date: hit.added_date,
        dump_date: hit.dump_date,
        item_size: hit.item_size,
        uploader: hit.uploader.clone(),
        scanner: hit.scanner.clone(),
        upload_state: hit.upload_state.clone(),
        contents: hit.contents,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
