//! Freshness-based backoff
//!
//! Instead of a fixed timer the schedulers look at how stale the most
//! overdue site is. A fleet checked within the last day earns the longest
//! pause; once the oldest check passes the freshness window the next
//! cycle runs immediately.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A site checked longer ago than this is always due
pub const FRESHNESS_WINDOW_HOURS: i64 = 72;

/// Computes the pause before the next cycle
///
/// `None` means run now: either no site has ever been checked or the
/// oldest check is outside the freshness window.
pub fn backoff_for(oldest_check: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
    let oldest = oldest_check?;
    let hours = now.signed_duration_since(oldest).num_hours();

    if hours >= FRESHNESS_WINDOW_HOURS {
        return None;
    }

    let secs = if hours < 24 {
        60
    } else if hours < 48 {
        45
    } else {
        30
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_never_checked_runs_immediately() {
        assert_eq!(backoff_for(None, Utc::now()), None);
    }

    #[test]
    fn test_backoff_tiers() {
        let now = Utc::now();
        let at = |hours: i64| Some(now - ChronoDuration::hours(hours));

        assert_eq!(backoff_for(at(10), now), Some(Duration::from_secs(60)));
        assert_eq!(backoff_for(at(30), now), Some(Duration::from_secs(45)));
        assert_eq!(backoff_for(at(60), now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_stale_fleet_runs_immediately() {
        let now = Utc::now();
        assert_eq!(backoff_for(Some(now - ChronoDuration::hours(80)), now), None);
        assert_eq!(backoff_for(Some(now - ChronoDuration::hours(72)), now), None);
    }

    #[test]
    fn test_future_timestamp_gets_max_backoff() {
        let now = Utc::now();
        assert_eq!(
            backoff_for(Some(now + ChronoDuration::hours(1)), now),
            Some(Duration::from_secs(60))
        );
    }
}
