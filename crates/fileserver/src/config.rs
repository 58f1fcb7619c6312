//! Server configuration loaded from a JSON file and the environment

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::roots::RootSet;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default upper bound for a single filesystem call, in seconds
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directories browsable without a token
    #[serde(rename = "ROOT_PATHS")]
    pub root_paths: Vec<PathBuf>,
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Append-only file receiving one line per playback start
    #[serde(default)]
    pub watch_log: Option<PathBuf>,
    /// Upper bound for a single filesystem call
    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,
    /// Refuse tokens that decode to paths outside every root
    #[serde(default)]
    pub confine_to_roots: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_storage_timeout_secs() -> u64 {
    DEFAULT_STORAGE_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            host: default_host(),
            port: default_port(),
            watch_log: None,
            storage_timeout_secs: default_storage_timeout_secs(),
            confine_to_roots: false,
        }
    }
}

impl Config {
    /// Parse configuration from JSON text
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &json)
    }

    /// Load configuration the way the server binary does
    ///
    /// Reads the file named by `ARCHIVE_CONFIG` (default `config.json`) and
    /// then applies `ARCHIVE_HOST`, `ARCHIVE_PORT` and `ARCHIVE_WATCH_LOG`
    /// overrides from the environment.
    pub fn load() -> Self {
        let path = std::env::var("ARCHIVE_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path), |name| std::env::var(name).ok())
    }

    /// Load `path` and apply overrides from `lookup`, never failing
    ///
    /// A broken file falls back to the defaults and a bad override is
    /// skipped. Both are logged; the server still starts, just possibly with
    /// nothing to browse.
    pub fn load_from<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(path).unwrap_or_else(|e| {
            tracing::error!("Failed to load config: {}", e);
            Self::default()
        });
        if let Err(e) = config.apply_env(lookup) {
            tracing::error!("Ignoring environment override: {}", e);
        }
        config
    }

    /// Apply environment overrides using the given lookup
    ///
    /// The port is applied last, so an unparsable port leaves every other
    /// override in place.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ARCHIVE_HOST") {
            self.host = host;
        }
        if let Some(watch_log) = lookup("ARCHIVE_WATCH_LOG") {
            self.watch_log = Some(PathBuf::from(watch_log));
        }
        if let Some(port) = lookup("ARCHIVE_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::Env {
                name: "ARCHIVE_PORT",
                value: port,
            })?;
        }
        Ok(())
    }

    /// The configured roots as an immutable [`RootSet`]
    pub fn root_set(&self) -> RootSet {
        RootSet::new(self.root_paths.iter().cloned())
    }

    /// Per-call filesystem timeout
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }
}
