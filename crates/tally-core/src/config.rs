//! Engine configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default per-topic broadcast capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for asynchronous validation rules, in milliseconds
pub const DEFAULT_RULE_TIMEOUT_MS: u64 = 5_000;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Broadcast capacity of every topic (store and binder streams)
    pub channel_capacity: usize,

    /// SQLite database path; `None` keeps documents in memory only
    pub database_path: Option<PathBuf>,

    /// Default timeout applied to asynchronous validation rules, in
    /// milliseconds; an unresolved check degrades to non-blocking-valid
    pub rule_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            database_path: None,
            rule_timeout_ms: DEFAULT_RULE_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the topic broadcast capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Persist documents to the given SQLite database.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the default async rule timeout.
    pub fn with_rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Default async rule timeout as a [`Duration`].
    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CoreError::InvalidConfig(format!("{}: {e}", path.display())))?;
        if config.channel_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "channel_capacity must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}
