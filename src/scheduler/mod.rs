//! Self-throttling background schedulers
//!
//! Two independent schedulers share the same shape: on start they spawn an
//! immediate one-shot cycle plus a continuous loop that peeks at the most
//! overdue site and backs off while the fleet is fresh. Stopping signals a
//! watch channel and waits for both tasks to finish.

pub mod archive;
pub mod backoff;
pub mod collection;

use std::time::Duration;
use tokio::sync::watch;

pub use archive::ArchiveScheduler;
pub use collection::CollectionScheduler;

/// Sleeps unless the stop signal fires first; returns true when stopped
pub(crate) async fn pause(stop: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = stop.changed() => true,
    }
}

/// Pause between failed repository peeks in the continuous loops
pub(crate) const PEEK_ERROR_PAUSE: Duration = Duration::from_secs(10);

/// Pause after a completed cycle before re-evaluating backoff
pub(crate) const POST_CYCLE_PAUSE: Duration = Duration::from_secs(1);
