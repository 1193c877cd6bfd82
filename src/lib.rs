//! SMBC Harvest: a multi-source comic metadata scraper
//!
//! This crate retrieves and normalizes metadata for the SMBC comic series
//! (publication date, transcript text, hover text, canonical URL, images)
//! from three independent web sources plus a local markdown archive, and
//! funnels everything into one unified record schema for tabular export.
//!
//! All network I/O goes through a shared rate-limited, disk-cached,
//! retrying fetch layer; any single page or request may fail without
//! aborting a run.

pub mod config;
pub mod export;
pub mod fetch;
pub mod paths;
pub mod record;
pub mod sources;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record error: {0}")]
    Record(#[from] record::RecordError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

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
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Settings;
pub use fetch::HttpClient;
pub use record::{ComicRecord, Source};
