//! Connection options and repository configuration.
//!
//! # Responsibility
//! - Carry provider-neutral connection options into `ConnectionProvider::connect`.
//! - Load repository wiring (adapter id, uri, options) from JSON.
//!
//! # Invariants
//! - Missing JSON fields fall back to `Default` values.
//! - Adapter selection is always explicit data, never process-global state.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Options passed to the provider when opening a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Create the database when it does not exist yet.
    pub create_if_missing: bool,
    pub read_only: bool,
    /// How long a provider waits on a locked source before failing.
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            read_only: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl ConnectOptions {
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn busy_timeout_ms(mut self, value: u64) -> Self {
        self.busy_timeout_ms = value;
        self
    }
}

/// Declarative repository wiring.
///
/// ```json
/// { "adapter": "sqlite", "uri": "sqlite:///var/data/app.db", "options": { "read_only": true } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Adapter id; when absent the adapter is chosen by URI scheme.
    #[serde(default)]
    pub adapter: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub options: ConnectOptions,
}

impl RepositoryConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            adapter: None,
            uri: uri.into(),
            options: ConnectOptions::default(),
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(value).map_err(ConfigError::Parse)?;
        if config.uri.trim().is_empty() {
            return Err(ConfigError::MissingUri);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    MissingUri,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid repository config: {err}"),
            Self::MissingUri => write!(f, "repository config requires a non-empty `uri`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::MissingUri => None,
        }
    }
}
