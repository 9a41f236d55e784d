//! Guard configuration
//!
//! Loaded from TOML. Every field has a default so a partial (or missing)
//! file yields a working guard.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{
    LockoutPolicy, DEFAULT_LOCKOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TEMPORARY_UNLOCK_SECS,
    UNLOCK_RECORD_KEY,
};

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory under ~/.config
const CONFIG_DIR_NAME: &str = "tillguard";

/// Default PIN length accepted by the input form
pub const DEFAULT_PIN_LENGTH: usize = 7;

/// Per-guard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Heading shown above the PIN form
    pub title: String,

    /// Explanation shown under the heading
    pub description: String,

    /// Consecutive wrong PINs before lockout
    pub max_attempts: u32,

    /// Lockout length in seconds
    pub lockout_secs: u64,

    /// Temporary unlock window in seconds
    pub temporary_unlock_secs: u64,

    /// Store key for the temporary unlock expiry
    pub unlock_record_key: String,

    /// Number of digits the input form accepts
    pub pin_length: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            title: "Restricted area".to_string(),
            description: "Enter the manager PIN to continue".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
            temporary_unlock_secs: DEFAULT_TEMPORARY_UNLOCK_SECS,
            unlock_record_key: UNLOCK_RECORD_KEY.to_string(),
            pin_length: DEFAULT_PIN_LENGTH,
        }
    }
}

impl GuardConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        // Try XDG_CONFIG_HOME first, then fall back to ~/.config
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
        }

        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the full config file path
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Self::config_dir()
            .map(|d| d.join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Parse a TOML document and validate it
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Reject settings the guard cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.lockout_secs == 0 {
            return Err(ConfigError::Invalid(
                "lockout_secs must be at least 1".to_string(),
            ));
        }
        if self.temporary_unlock_secs == 0 {
            return Err(ConfigError::Invalid(
                "temporary_unlock_secs must be at least 1".to_string(),
            ));
        }
        if self.unlock_record_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "unlock_record_key must not be empty".to_string(),
            ));
        }
        if self.pin_length == 0 {
            return Err(ConfigError::Invalid(
                "pin_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(self.max_attempts, self.lockout_secs)
    }

    pub fn temporary_unlock_window(&self) -> Duration {
        Duration::from_secs(self.temporary_unlock_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
