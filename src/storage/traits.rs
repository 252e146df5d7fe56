//! Repository trait and storage error types

use crate::models::{ArchiveRecord, StatSnapshot, TrackedSite};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Duplicate site URL: {0}")]
    DuplicateUrl(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an archive record upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was inserted
    Inserted,
    /// An existing row was updated in place
    Updated,
}

/// Trait for repository backends
///
/// This is the single persistence interface injected into the collector,
/// the archive matcher and both schedulers. Implementations provide the
/// site store, the snapshot store and the archive-record store.
pub trait Repository: Send {
    // ===== Tracked sites =====

    /// Registers a new tracked site with status `pending`
    ///
    /// Fails with [`StorageError::DuplicateUrl`] if the URL is already
    /// tracked.
    fn create_site(&mut self, url: &str) -> StorageResult<TrackedSite>;

    /// Gets a site by ID
    fn get_site(&self, id: i64) -> StorageResult<TrackedSite>;

    /// Gets a site by its canonical URL
    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<TrackedSite>>;

    /// Lists sites ordered by creation time, up to `limit`
    fn list_sites(&self, limit: u32) -> StorageResult<Vec<TrackedSite>>;

    /// Persists all mutable fields of a site and bumps `updated_at`
    fn update_site(&mut self, site: &TrackedSite) -> StorageResult<()>;

    /// Deletes a site; snapshots and archive records cascade
    fn delete_site(&mut self, id: i64) -> StorageResult<()>;

    /// Sites due for statistics collection
    ///
    /// Ordered by `last_check_at` ascending with never-checked sites
    /// first, limited to `limit`.
    fn due_for_collection(&self, limit: u32) -> StorageResult<Vec<TrackedSite>>;

    /// Sites due for an archive check
    ///
    /// Ordered by `archive_last_check_at` ascending with never-checked
    /// sites first, limited to `limit`.
    fn due_for_archive_check(&self, limit: u32) -> StorageResult<Vec<TrackedSite>>;

    /// Peeks at the most overdue site's collection timestamp
    ///
    /// Returns `None` when no sites are tracked, `Some(None)` when the
    /// most overdue site has never been checked, and `Some(Some(ts))`
    /// otherwise.
    fn oldest_collection_check(&self) -> StorageResult<Option<Option<DateTime<Utc>>>>;

    /// Peeks at the most overdue site's archive-check timestamp
    fn oldest_archive_check(&self) -> StorageResult<Option<Option<DateTime<Utc>>>>;

    // ===== Statistics snapshots =====

    /// Appends a snapshot row; the snapshot's `id` field is ignored
    fn create_snapshot(&mut self, snapshot: &StatSnapshot) -> StorageResult<i64>;

    /// Gets the most recent snapshot for a site
    fn latest_snapshot(&self, site_id: i64) -> StorageResult<Option<StatSnapshot>>;

    /// Counts snapshots for a site
    fn count_snapshots(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Archive records =====

    /// Inserts or updates an archive record keyed by
    /// `(site_id, ia_identifier)`; the record's `id` field is ignored
    fn upsert_archive_record(&mut self, record: &ArchiveRecord) -> StorageResult<UpsertOutcome>;

    /// Lists archive records for a site, newest dump first
    fn archive_records_for_site(&self, site_id: i64) -> StorageResult<Vec<ArchiveRecord>>;

    /// Counts archive records for a site
    fn count_archive_records(&self, site_id: i64) -> StorageResult<u64>;
}
