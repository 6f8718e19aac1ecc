//! Settings management
//!
//! Stores user preferences in ~/.config/pt-installer/settings.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Last directory installed into
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Default for "add to PATH"; the shell profile or registry is only
    /// touched when this or `--add-to-path` is set
    #[serde(default)]
    pub add_to_path: bool,

    /// Default for "create desktop shortcut"
    #[serde(default)]
    pub create_shortcut: bool,

    /// Download URL override (mirrors, pinned versions)
    #[serde(default)]
    pub download_url: Option<String>,
}

impl Settings {
    /// Get the config directory path (~/.config/pt-installer)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("pt-installer");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("Could not locate settings: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load settings from `path`; unreadable or invalid files fall back to
    /// defaults with a warning
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert!(!settings.add_to_path);
        assert!(!settings.create_shortcut);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/settings.json");
        let settings = Settings {
            install_dir: Some(PathBuf::from("/opt/android")),
            add_to_path: true,
            create_shortcut: true,
            download_url: Some("https://mirror.example/pt.zip".to_string()),
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "install_dir": "/home/me/Android" }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.install_dir, Some(PathBuf::from("/home/me/Android")));
        assert!(!settings.add_to_path);
        assert!(!settings.create_shortcut);
    }

    #[test]
    fn test_path_registration_is_opt_in() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        std::fs::write(&path, "{}").unwrap();
        assert!(!Settings::load_from(&path).add_to_path);

        std::fs::write(&path, r#"{ "add_to_path": true }"#).unwrap();
        assert!(Settings::load_from(&path).add_to_path);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
