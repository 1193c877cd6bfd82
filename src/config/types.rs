use serde::Deserialize;
use std::path::PathBuf;

/// Scraper settings for one run, assembled from built-in defaults, the
/// optional TOML file, and CLI flags (in increasing precedence).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory for the persistent HTTP response cache
    pub cache_dir: PathBuf,

    /// Base directory for raw HTML snapshots and downloaded images
    pub data_dir: PathBuf,

    /// Directory for exported tabular files
    pub output_dir: PathBuf,

    /// Maximum request rate in requests per second
    pub max_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("out"),
            max_rate: 2.0,
        }
    }
}

impl Settings {
    /// Applies the optional file config underneath any values already set
    /// from the CLI: only fields the CLI left at their defaults are filled.
    pub fn merge_file(&mut self, file: FileConfig, cli_overrode: &CliOverrides) {
        if !cli_overrode.cache_dir {
            if let Some(dir) = file.cache_dir {
                self.cache_dir = dir;
            }
        }
        if !cli_overrode.data_dir {
            if let Some(dir) = file.data_dir {
                self.data_dir = dir;
            }
        }
        if !cli_overrode.output_dir {
            if let Some(dir) = file.output_dir {
                self.output_dir = dir;
            }
        }
        if !cli_overrode.max_rate {
            if let Some(rate) = file.max_rate {
                self.max_rate = rate;
            }
        }
    }
}

/// Which settings were supplied explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub cache_dir: bool,
    pub data_dir: bool,
    pub output_dir: bool,
    pub max_rate: bool,
}

/// Optional TOML file mirroring the global CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(rename = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    #[serde(rename = "data-dir")]
    pub data_dir: Option<PathBuf>,

    #[serde(rename = "output-dir")]
    pub output_dir: Option<PathBuf>,

    #[serde(rename = "max-rate")]
    pub max_rate: Option<f64>,
}
