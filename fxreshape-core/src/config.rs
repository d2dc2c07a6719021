//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! archive_dir = "./forexite"
//! csv_dir = "./csv"
//! window_days = 2555
//! base_url = "https://www.forexite.com/free_forex_quotes"
//! timeout_secs = 60
//! user_agent = "fxreshape/0.1"
//! resample_minutes = 15
//! ```

use crate::data::fetch::DEFAULT_WINDOW_DAYS;
use crate::data::forexite::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where daily archives are stored.
    pub archive_dir: PathBuf,
    /// Where per-instrument files are written and read.
    pub csv_dir: PathBuf,
    /// Look-back window for the fetcher, in calendar days.
    pub window_days: u32,
    /// Root of the remote archive tree.
    pub base_url: String,
    /// Per-request timeout for archive downloads.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Default bucket width for `load`/`overlay` when none is given.
    pub resample_minutes: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("./forexite"),
            csv_dir: PathBuf::from("./csv"),
            window_days: DEFAULT_WINDOW_DAYS,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            user_agent: concat!("fxreshape/", env!("CARGO_PKG_VERSION")).to_string(),
            resample_minutes: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
