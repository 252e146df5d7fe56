//! Storage layer
//!
//! The repository trait abstracts all persistence so components can be
//! tested against an in-memory database. The production backend is SQLite.

pub mod schema;
pub mod sqlite;
pub mod traits;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use sqlite::SqliteRepository;
pub use traits::{Repository, StorageError, StorageResult, UpsertOutcome};

/// A repository shared between the collector, matcher and both schedulers
///
/// The guard is only ever held across a single synchronous database call,
/// never across an HTTP request.
pub type SharedRepository<R> = Arc<Mutex<R>>;

/// Wraps a repository for shared use
pub fn shared<R: Repository>(repo: R) -> SharedRepository<R> {
    Arc::new(Mutex::new(repo))
}
