//! Service configuration
//!
//! ```toml
//! default_dataset = "data/rates.csv"
//! average_policy = "reject_empty"
//!
//! [cache]
//! enabled = true
//! max_entries = 1024
//!
//! [upload]
//! max_bytes = 10485760
//! allowed_content_types = ["text/csv"]
//! ```

use crate::cache::CacheConfig;
use crate::engine::AveragePolicy;
use crate::error::{RateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Content type accepted for uploads unless configured otherwise
pub const TEXT_CSV: &str = "text/csv";

/// Upload preconditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted payload in bytes
    pub max_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![TEXT_CSV.to_string()],
        }
    }
}

/// Top-level configuration for [`crate::service::RateService`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// CSV file loaded into the store at startup
    pub default_dataset: Option<PathBuf>,
    pub average_policy: AveragePolicy,
    pub cache: CacheConfig,
    pub upload: UploadConfig,
}

impl ServiceConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| RateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Read configuration from a TOML file
    ///
    /// A relative `default_dataset` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RateError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let (Some(dataset), Some(dir)) = (config.default_dataset.as_ref(), path.parent()) {
            if dataset.is_relative() {
                config.default_dataset = Some(dir.join(dataset));
            }
        }

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given and present, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path.exists() => match Self::load(path) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("{}; using defaults", e);
                    Self::default()
                }
            },
            Some(path) => {
                log::warn!("Config file {} not found; using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        }
    }
}
