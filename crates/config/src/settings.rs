// User settings
// Loaded from ~/.nelson/settings.json

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::Environment;

/// Default upper bound for a submission archive (8 MiB).
pub const DEFAULT_MAX_ZIP_SIZE: u64 = 8 << 20;

/// Default seconds between two result polls.
pub const DEFAULT_REFRESH_TIME: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Environment used when no --environment flag is given
    pub environment: Environment,

    /// Identity provider override (`udacity`, `gt`, `developer`).
    /// Empty = the service default.
    pub id_provider: Option<String>,

    /// Seconds between result polls
    pub refresh_time: f64,

    /// Archive size limit in bytes
    pub max_zip_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            id_provider: None,
            refresh_time: DEFAULT_REFRESH_TIME,
            max_zip_size: DEFAULT_MAX_ZIP_SIZE,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::app_data_dir().join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults silently; an unreadable or
    /// malformed file is reported and also yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Error parsing settings, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Error reading settings, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_zip_size, 8 * 1024 * 1024);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"environment": "staging", "refresh_time": 0.5}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.refresh_time, 0.5);
        assert_eq!(settings.max_zip_size, DEFAULT_MAX_ZIP_SIZE);
        assert!(settings.id_provider.is_none());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn full_file_overrides_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"environment": "development", "id_provider": "developer", "refresh_time": 1.0, "max_zip_size": 1024}"#,
        )
        .unwrap();

        let expected = Settings {
            environment: Environment::Development,
            id_provider: Some("developer".into()),
            refresh_time: 1.0,
            max_zip_size: 1024,
        };
        assert_eq!(Settings::load_from(&path), expected);
    }
}
