//! Configuration management for Loci.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{LociError, Result};
use crate::loader::{LoaderBuilder, PathMatchingResourceLoader};
use crate::matcher::PathMatcher;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for Loci.
///
/// ## Example Configuration File (loci.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
/// base_dir = "/srv/app"
///
/// [class_path]
/// entries = ["target/classes", "lib/commons.jar"]
///
/// [matcher]
/// case_sensitive = true
/// trim_tokens = false
/// cache_patterns = true
///
/// [walk]
/// follow_links = false
/// max_depth = 64
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Class path layers
    pub class_path: ClassPathConfig,

    /// Pattern matcher options
    pub matcher: MatcherConfig,

    /// Directory walk options
    pub walk: WalkConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Base directory for relative paths (None = working directory)
    pub base_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            base_dir: None,
        }
    }
}

/// Class path configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassPathConfig {
    /// Directories and archives, searched in order
    pub entries: Vec<PathBuf>,
}

/// Matcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Compare path characters case-sensitively
    pub case_sensitive: bool,

    /// Trim whitespace around path segments
    pub trim_tokens: bool,

    /// Cache compiled pattern segments
    pub cache_patterns: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            case_sensitive: true,
            trim_tokens: false,
            cache_patterns: true,
        }
    }
}

/// Directory walk configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Follow symbolic links
    pub follow_links: bool,

    /// Maximum walk depth below a search root (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| LociError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| LociError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "loci").ok_or_else(|| LociError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("loci.toml"))
    }

    /// Base directory for relative paths (from config or working directory).
    pub fn base_dir(&self) -> PathBuf {
        match &self.general.base_dir {
            Some(path) => path.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Class path entries, relative ones resolved against the base directory.
    pub fn class_path_entries(&self) -> Vec<PathBuf> {
        let base_dir = self.base_dir();
        self.class_path
            .entries
            .iter()
            .map(|entry| {
                if entry.is_absolute() {
                    entry.clone()
                } else {
                    base_dir.join(entry)
                }
            })
            .collect()
    }

    /// A matcher configured from the `[matcher]` section.
    pub fn path_matcher(&self) -> PathMatcher {
        PathMatcher::new()
            .case_sensitive(self.matcher.case_sensitive)
            .trim_tokens(self.matcher.trim_tokens)
            .cache_patterns(self.matcher.cache_patterns)
    }

    /// A loader builder populated from this configuration.
    pub fn loader_builder(&self) -> LoaderBuilder {
        PathMatchingResourceLoader::builder()
            .matcher(self.path_matcher())
            .base_dir(self.base_dir())
            .class_path_entries(self.class_path_entries())
            .follow_links(self.walk.follow_links)
            .max_depth(self.walk.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.class_path.entries.is_empty());
        assert!(config.matcher.case_sensitive);
        assert!(config.matcher.cache_patterns);
        assert_eq!(config.walk.max_depth, None);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.general.base_dir = Some(PathBuf::from("/srv/app"));
        config.class_path.entries = vec![PathBuf::from("lib/commons.jar")];
        config.walk.max_depth = Some(8);

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[matcher]\ncase_sensitive = false\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(!config.matcher.case_sensitive);
        assert!(config.matcher.cache_patterns); // Default value
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "[walk]\nmax_depth = \"deep\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&config_path),
            Err(LociError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_class_path_entries_resolved_against_base_dir() {
        let mut config = Config::default();
        config.general.base_dir = Some(PathBuf::from("/srv/app"));
        config.class_path.entries = vec![
            PathBuf::from("target/classes"),
            PathBuf::from("/opt/lib/commons.jar"),
        ];

        assert_eq!(
            config.class_path_entries(),
            vec![
                PathBuf::from("/srv/app/target/classes"),
                PathBuf::from("/opt/lib/commons.jar"),
            ]
        );
    }

    #[test]
    fn test_path_matcher_options() {
        let mut config = Config::default();
        config.matcher.case_sensitive = false;

        let matcher = config.path_matcher();
        assert!(matcher.matches("**/*.XML", "web-inf/web.xml"));
    }

    #[test]
    fn test_loader_builder() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.base_dir = Some(temp_dir.path().to_path_buf());

        let loader = config.loader_builder().build();
        assert_eq!(loader.base_dir(), temp_dir.path());
        assert!(loader.class_path().is_empty());
    }
}
