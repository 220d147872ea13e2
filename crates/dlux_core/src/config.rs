//! Configuration for the coordination services.
//!
//! [`CollabConfig`] holds the timing and sizing knobs used by the editor
//! metadata, error handling and auto-save components. It is persisted as TOML;
//! every field has a default so partial files are accepted.
//!
//! # Key Configuration Fields
//!
//! - `auto_save_threshold_ms`: idle time after the last edit before auto-save
//! - `init_grace_period_ms`: time after editor creation during which auto-save is suppressed
//! - `min_save_interval_ms`: minimum spacing between two saves
//! - `max_error_history`: capacity of the error ring buffer
//! - `default_retries` / `default_retry_delay_ms`: retry policy for `handle_async`
//!
//! # Example
//!
//! ```ignore
//! use dlux_core::config::CollabConfig;
//!
//! let config = CollabConfig::from_toml_str("auto_save_threshold_ms = 10000")?;
//! assert_eq!(config.auto_save_threshold().as_secs(), 10);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CollabError, Result};

/// Tunable timings and limits for the coordination services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollabConfig {
    /// Minimum idle time since the last modification before an automatic save.
    pub auto_save_threshold_ms: u64,

    /// Auto-save is never due while the editor is younger than this.
    pub init_grace_period_ms: u64,

    /// Minimum time between the last completed save and the next automatic one.
    pub min_save_interval_ms: u64,

    /// How often the auto-save scheduler checks whether a save is due.
    pub auto_save_poll_interval_ms: u64,

    /// Capacity of the error history ring buffer.
    pub max_error_history: usize,

    /// Retries used by `handle_async` when the caller does not specify any.
    pub default_retries: u32,

    /// Base back-off delay used by `handle_async` when the caller does not specify one.
    pub default_retry_delay_ms: u64,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            auto_save_threshold_ms: 30_000,
            init_grace_period_ms: 3_000,
            min_save_interval_ms: 5_000,
            auto_save_poll_interval_ms: 5_000,
            max_error_history: 100,
            default_retries: 0,
            default_retry_delay_ms: 1_000,
        }
    }
}

impl CollabConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CollabConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CollabError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load config from a path, returning the defaults if it is missing or invalid.
    pub fn load_from_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("[CollabConfig] using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = self.to_toml_string()?;
        std::fs::write(path, contents).map_err(|e| CollabError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Auto-save idle threshold as a [`Duration`].
    pub fn auto_save_threshold(&self) -> Duration {
        Duration::from_millis(self.auto_save_threshold_ms)
    }

    /// Initialization grace period as a [`Duration`].
    pub fn init_grace_period(&self) -> Duration {
        Duration::from_millis(self.init_grace_period_ms)
    }

    /// Minimum spacing between saves as a [`Duration`].
    pub fn min_save_interval(&self) -> Duration {
        Duration::from_millis(self.min_save_interval_ms)
    }

    /// Scheduler poll interval as a [`Duration`].
    pub fn auto_save_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auto_save_poll_interval_ms)
    }

    /// Default retry back-off base as a [`Duration`].
    pub fn default_retry_delay(&self) -> Duration {
        Duration::from_millis(self.default_retry_delay_ms)
    }
}
