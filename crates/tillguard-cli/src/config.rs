//! CLI configuration file
//!
//! ```toml
//! pin_hash = "$argon2id$v=19$..."
//! store_path = "/var/lib/tillguard/store.json"
//!
//! [guard]
//! title = "Finances"
//! lockout_secs = 300
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tillguard_core::{ConfigError, GuardConfig, JsonFileStore, KeyValueStore, MemoryStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Argon2id PHC hash of the manager PIN
    pub pin_hash: Option<String>,

    /// Where the temporary unlock record is kept
    pub store_path: Option<PathBuf>,

    /// Guard settings
    pub guard: GuardConfig,
}

impl CliConfig {
    /// Load from an explicit path, or the default location if none is given.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match GuardConfig::config_file_path() {
                Ok(p) => p,
                Err(ConfigError::NoConfigDir) => return Ok(Self::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.guard.validate()?;
        Ok(config)
    }

    /// Write a config file, creating its directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
            }
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, contents).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(JsonFileStore::default_path)
    }

    /// Open the configured store, or an in-memory one if it cannot be created
    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match JsonFileStore::new(self.store_path()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!("Store unavailable, temporary unlocks will not persist: {}", e);
                Arc::new(MemoryStore::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.pin_hash.is_none());
        assert_eq!(config.guard, GuardConfig::default());
        assert_eq!(config.store_path(), JsonFileStore::default_path());
    }

    #[test]
    fn test_nested_guard_table() {
        let config = CliConfig::from_toml(
            r#"
            pin_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"
            store_path = "/tmp/tillguard.json"

            [guard]
            title = "Finances"
            temporary_unlock_secs = 1800
            "#,
        )
        .unwrap();

        assert_eq!(config.guard.title, "Finances");
        assert_eq!(config.guard.temporary_unlock_secs, 1800);
        assert_eq!(config.guard.lockout_secs, 300);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/tillguard.json"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("tillguard").join("config.toml");

        let config = CliConfig {
            pin_hash: Some("hash".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(CliConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_unopenable_store_falls_back_to_memory() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let config = CliConfig {
            store_path: Some(blocker.join("store.json")),
            ..Default::default()
        };
        let store = config.open_store();
        store.set("temp_unlock_until", "1").unwrap();

        assert_eq!(store.get("temp_unlock_until").unwrap().as_deref(), Some("1"));
        assert!(!blocker.join("store.json").exists());
    }

    #[test]
    fn test_invalid_guard_section_rejected() {
        assert!(matches!(
            CliConfig::from_toml("[guard]\nmax_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
