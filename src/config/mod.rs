//! Runtime configuration for the transfer subsystem.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default HTTP connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large attachments).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Default reachability probe endpoint.
///
/// Any well-known always-up endpoint works; the probe only cares whether an
/// HTTP response comes back at all.
pub const DEFAULT_PROBE_URL: &str = "https://connectivitycheck.gstatic.com/generate_204";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON or has the wrong shape.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration for the attachment transfer subsystem.
///
/// All fields default to sensible values, so a missing or partial config
/// file still yields a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Directory holding the attachment cache.
    pub cache_dir: PathBuf,
    /// Base URL of the sync API used for attachment metadata queries.
    pub api_host: String,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Endpoint used by the reachability probe.
    pub probe_url: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".attachment-cache"),
            api_host: "https://api.example.com".to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            probe_url: DEFAULT_PROBE_URL.to_string(),
        }
    }
}

impl TransferConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its contents are not valid configuration
    /// JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
