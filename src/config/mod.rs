//! Configuration loading, parsing and validation

pub mod parser;
pub mod types;
pub mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{ArchiveConfig, CollectionConfig, Config, HttpConfig, StorageConfig};
