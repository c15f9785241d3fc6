use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::KirokuError;
use crate::models::WatchStatus;
use crate::store::StoreOptions;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub popular_limit: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub auto_mark_completed: bool,
    pub default_status: WatchStatus,
}

impl LibraryConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            default_status: self.default_status,
            auto_mark_completed: self.auto_mark_completed,
        }
    }
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, KirokuError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file yields the defaults; keys
    /// absent from the file keep their default values.
    pub fn load_from(path: &Path) -> Result<Self, KirokuError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let user_str =
            std::fs::read_to_string(path).map_err(|e| KirokuError::Config(e.to_string()))?;
        Self::from_toml(&user_str)
    }

    /// Parse a (possibly partial) TOML document over the defaults.
    pub fn from_toml(user_str: &str) -> Result<Self, KirokuError> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| KirokuError::Config(e.to_string()))?;
        let user: toml::Value =
            toml::from_str(user_str).map_err(|e| KirokuError::Config(e.to_string()))?;
        merge(&mut merged, user);
        let config = merged
            .try_into::<AppConfig>()
            .map_err(|e| KirokuError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the catalog client cannot work with.
    pub fn validate(&self) -> Result<(), KirokuError> {
        if self.catalog.timeout_secs == 0 {
            return Err(KirokuError::Config(
                "catalog.timeout_secs must be at least 1".into(),
            ));
        }
        if self.catalog.popular_limit == 0 {
            return Err(KirokuError::Config(
                "catalog.popular_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), KirokuError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), KirokuError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KirokuError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("kiroku.db"))
            .unwrap_or_else(|| PathBuf::from("kiroku.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, KirokuError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "kiroku")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `overlay` onto `base`, table by table.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.catalog.base_url, "https://api.jikan.moe/v4");
        assert_eq!(config.catalog.popular_limit, 18);
        assert!(config.library.auto_mark_completed);
        assert_eq!(config.library.default_status, WatchStatus::PlanToWatch);
    }

    #[test]
    fn test_partial_user_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [catalog]
            popular_limit = 25

            [library]
            default_status = "watching"
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.popular_limit, 25);
        assert_eq!(config.catalog.timeout_secs, 30);
        assert_eq!(config.library.default_status, WatchStatus::Watching);
        assert!(config.library.auto_mark_completed);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = AppConfig::from_toml("[library]\ndefault_status = \"binging\"").unwrap_err();
        assert!(matches!(err, KirokuError::Config(_)));
        let err = AppConfig::from_toml("not = [valid").unwrap_err();
        assert!(matches!(err, KirokuError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_and_limit_are_rejected() {
        let err = AppConfig::from_toml("[catalog]\ntimeout_secs = 0").unwrap_err();
        assert!(matches!(err, KirokuError::Config(ref m) if m.contains("timeout_secs")));
        let err = AppConfig::from_toml("[catalog]\npopular_limit = 0").unwrap_err();
        assert!(matches!(err, KirokuError::Config(ref m) if m.contains("popular_limit")));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());

        let mut config = AppConfig::default();
        config.catalog.base_url = "http://localhost:8080/v4".into();
        config.library.auto_mark_completed = false;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_store_options_from_config() {
        let options = AppConfig::default().library.store_options();
        assert!(options.auto_mark_completed);
        assert_eq!(options.default_status, WatchStatus::PlanToWatch);
    }
}
