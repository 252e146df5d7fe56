//! Statistics snapshot entity

use chrono::{DateTime, Utc};

/// One timestamped statistics reading for a tracked site
///
/// Snapshots are append-only; a site's "current" statistics are its most
/// recent snapshot. `id` is assigned by the repository on insert.
#[derive(Debug, Clone)]
pub struct StatSnapshot {
    pub id: i64,
    pub site_id: i64,
    pub observed_at: DateTime<Utc>,

    // From siteinfo.statistics
    pub pages: i64,
    pub articles: i64,
    pub edits: i64,
    pub images: i64,
    pub users: i64,
    pub active_users: i64,
    pub admins: i64,
    pub jobs: i64,

    // Availability metrics
    pub response_time_ms: Option<i64>,
    pub http_status: Option<i64>,
}
