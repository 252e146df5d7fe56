//! Archive.org backup discovery
//!
//! Searches the archive.org advanced search API for items whose
//! `originalurl` points at a tracked wiki, fetches item metadata, and
//! reconciles the results into the archive-record store.

pub mod client;
pub mod matcher;
pub mod size;

use thiserror::Error;

pub use client::{ArchiveClient, ArchiveHit};
pub use matcher::{ArchiveMatcher, ArchiveReport};
pub use size::{format_bytes, parse_size};

/// Errors produced while talking to the archive service
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Site {site_id} has no detected API URL")]
    MissingApiUrl { site_id: i64 },
}
