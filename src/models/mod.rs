//! Domain model types
//!
//! These are the persisted entities: tracked sites, their statistics
//! snapshots, and archive.org backup records. The tracked site is the
//! aggregate root; snapshots and archive records cascade on delete.

pub mod archive;
pub mod site;
pub mod snapshot;

pub use archive::{ArchiveRecord, DumpContents};
pub use site::{SiteStatus, TrackedSite};
pub use snapshot::StatSnapshot;
