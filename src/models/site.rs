//! Tracked site entity and lifecycle status

use chrono::{DateTime, Utc};

/// Lifecycle status of a tracked site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// Newly registered, never successfully collected
    Pending,
    /// Last collection succeeded
    Ok,
    /// Last collection failed
    Error,
    /// Site is known to be gone
    Offline,
}

impl SiteStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(self) -> &'static str {
        match self {
            SiteStatus::Pending => "pending",
            SiteStatus::Ok => "ok",
            SiteStatus::Error => "error",
            SiteStatus::Offline => "offline",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SiteStatus::Pending),
            "ok" => Some(SiteStatus::Ok),
            "error" => Some(SiteStatus::Error),
            "offline" => Some(SiteStatus::Offline),
            _ => None,
        }
    }
}

/// One externally hosted MediaWiki site under monitoring
///
/// `url` is globally unique. `api_url` is treated as unique in practice,
/// enforced by the reconciler rather than a database constraint.
#[derive(Debug, Clone)]
pub struct TrackedSite {
    pub id: i64,

    /// Canonical site URL as registered
    pub url: String,

    /// Validated API endpoint, once discovered
    pub api_url: Option<String>,

    /// Browse endpoint paired with `api_url`
    pub index_url: Option<String>,

    // Metadata from siteinfo.general
    pub sitename: Option<String>,
    pub lang: Option<String>,
    pub dbtype: Option<String>,
    pub dbversion: Option<String>,
    /// MediaWiki generator string, e.g. "MediaWiki 1.39.1"
    pub engine_version: Option<String>,
    pub max_page_id: Option<i64>,

    // Status and tracking
    pub status: SiteStatus,
    pub has_archive: bool,
    pub api_available: bool,

    // Collection error tracking
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_check_at: Option<DateTime<Utc>>,

    // Archive check tracking
    pub archive_last_check_at: Option<DateTime<Utc>>,
    pub archive_last_error: Option<String>,
    pub archive_last_error_at: Option<DateTime<Utc>>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_string_round_trip() {
        for status in [
            SiteStatus::Pending,
            SiteStatus::Ok,
            SiteStatus::Error,
            SiteStatus::Offline,
        ] {
            let s = status.to_db_string();
            assert_eq!(SiteStatus::from_db_string(s), Some(status));
        }
    }

    #[test]
    fn test_status_unknown_string() {
        assert_eq!(SiteStatus::from_db_string("bogus"), None);
    }
}
