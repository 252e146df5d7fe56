use serde::Deserialize;

/// Main configuration structure for WikiVault
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            collection: CollectionConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

/// HTTP client configuration shared by all outbound requests
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Statistics collection scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Target collection interval per site, in minutes
    #[serde(rename = "interval-minutes", default = "default_collection_interval")]
    pub interval_minutes: u64,

    /// Pause between consecutive sites within a cycle, in seconds
    #[serde(rename = "item-delay-secs", default = "default_collection_delay")]
    pub item_delay_secs: f64,

    /// Maximum number of sites processed per cycle
    #[serde(rename = "batch-size", default = "default_collection_batch")]
    pub batch_size: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_collection_interval(),
            item_delay_secs: default_collection_delay(),
            batch_size: default_collection_batch(),
        }
    }
}

/// Archive check scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Target archive-check interval per site, in minutes
    #[serde(rename = "interval-minutes", default = "default_archive_interval")]
    pub interval_minutes: u64,

    /// Pause between consecutive sites within a cycle, in seconds
    #[serde(rename = "item-delay-secs", default = "default_archive_delay")]
    pub item_delay_secs: f64,

    /// Maximum number of sites processed per cycle
    #[serde(rename = "batch-size", default = "default_archive_batch")]
    pub batch_size: u32,

    /// Base URL of the archive service
    #[serde(default = "default_archive_endpoint")]
    pub endpoint: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_archive_interval(),
            item_delay_secs: default_archive_delay(),
            batch_size: default_archive_batch(),
            endpoint: default_archive_endpoint(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("WikiVault/{}", env!("CARGO_PKG_VERSION"))
}

fn default_database_path() -> String {
    "./wikivault.db".to_string()
}

fn default_collection_interval() -> u64 {
    60
}

fn default_collection_delay() -> f64 {
    1.5
}

fn default_collection_batch() -> u32 {
    50
}

fn default_archive_interval() -> u64 {
    720
}

fn default_archive_delay() -> f64 {
    1.0
}

fn default_archive_batch() -> u32 {
    100
}

fn default_archive_endpoint() -> String {
    "https://archive.org".to_string()
}
