//! Application settings management
//!
//! Stores non-sensitive configuration in a plain JSON file next to the
//! stores directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::KeyDerivationParams;
use crate::error::Result;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Store used when no `--store` is given
    pub default_store: Option<String>,
    /// Argon2 parameters for newly created stores
    pub kdf: KeyDerivationParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            default_store: None,
            kdf: KeyDerivationParams::default(),
        }
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Create a new settings manager, loading `settings.json` from `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let settings_file = data_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file)?;

        Ok(Self {
            settings_file,
            settings,
        })
    }

    /// Load settings from file
    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.settings_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Get the default store name
    pub fn default_store(&self) -> Option<&str> {
        self.settings.default_store.as_deref()
    }

    /// Set the default store and save
    pub async fn set_default_store(&mut self, name: Option<String>) -> Result<()> {
        self.settings.default_store = name;
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_settings_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path()).unwrap();

        let settings = manager.get();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.default_store, None);
        assert_eq!(settings.kdf, KeyDerivationParams::default());
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
            manager
                .set_default_store(Some("personal".to_string()))
                .await
                .unwrap();
        }

        {
            let manager = SettingsManager::new(temp_dir.path()).unwrap();
            assert_eq!(manager.default_store(), Some("personal"));
            assert_eq!(manager.get().kdf, KeyDerivationParams::default());
        }
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("settings.json"),
            r#"{"defaultStore":"work"}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path()).unwrap();
        assert_eq!(manager.default_store(), Some("work"));
        assert_eq!(manager.get().kdf, KeyDerivationParams::default());
    }

    #[tokio::test]
    async fn test_kdf_read_from_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("settings.json"),
            r#"{"kdf":{"memoryCost":8192,"timeCost":1,"parallelism":1}}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path()).unwrap();
        assert_eq!(manager.get().kdf.memory_cost, 8192);
        assert_eq!(manager.default_store(), None);
    }
}
