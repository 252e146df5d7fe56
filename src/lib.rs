//! WikiVault: a MediaWiki fleet tracker
//!
//! This crate tracks a curated set of externally hosted MediaWiki sites:
//! it discovers each site's API endpoint, periodically collects siteinfo
//! statistics, and cross-references archive.org for public backups.

pub mod archive;
pub mod collector;
pub mod config;
pub mod mediawiki;
pub mod models;
pub mod scheduler;
pub mod storage;

use thiserror::Error;

/// Main error type for WikiVault operations
#[derive(Debug, Error)]
pub enum WikiVaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("MediaWiki error: {0}")]
    MediaWiki(#[from] mediawiki::MediaWikiError),

    #[error("Archive error: {0}")]
    Archive(#[from] archive::ArchiveError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for WikiVault operations
pub type Result<T> = std::result::Result<T, WikiVaultError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use collector::{CollectOutcome, Collector};
pub use config::Config;
pub use models::{SiteStatus, TrackedSite};
pub use storage::{Repository, SharedRepository, SqliteRepository};
