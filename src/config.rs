//! Host configuration loaded from TOML.

use std::path::{Path, PathBuf};

use federated_search::{SearchConfig, SortRegistry, StaticTaxonomy};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Top-level host configuration.
///
/// ```toml
/// taxonomy_path = "/var/lib/fedsearch/taxonomy.json"
///
/// [search]
/// primary_url = "http://localhost:8000/api/search-wrapper"
/// secondary_url = "http://localhost:8080"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON taxonomy used to build facet trees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy_path: Option<PathBuf>,
    /// Aggregator settings.
    pub search: SearchConfig,
    /// Sort-metadata override. The built-in registry is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<SortRegistry>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// search settings fail validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?;
        config.search.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/fedsearch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("fedsearch").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("fedsearch")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/fedsearch-config/config.toml")
        }
    }

    /// Load the configured taxonomy, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the taxonomy file cannot be read or parsed.
    pub fn load_taxonomy(&self) -> Result<Option<StaticTaxonomy>> {
        self.taxonomy_path
            .as_deref()
            .map(StaticTaxonomy::from_file)
            .transpose()
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AppConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("fedsearch"));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nsecondary_category = \"Mishnah\"\n").expect("write");

        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.search.secondary_category, "Mishnah");
        assert_eq!(config.search.default_slop, SearchConfig::default().default_slop);
        assert!(config.sorts.is_none());
    }

    #[test]
    fn invalid_search_settings_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ntimeout_seconds = 0\n").expect("write");
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Search(_))));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.search.facet_count_timeout_ms = 1500;
        config.sorts = Some(SortRegistry::default());
        config.save_to_file(&path).expect("save");

        let loaded = AppConfig::from_file(&path).expect("load");
        assert_eq!(loaded.search.facet_count_timeout_ms, 1500);
        assert_eq!(loaded.sorts, Some(SortRegistry::default()));
    }

    #[test]
    fn no_taxonomy_configured() {
        assert!(AppConfig::default().load_taxonomy().expect("load").is_none());
    }
}
