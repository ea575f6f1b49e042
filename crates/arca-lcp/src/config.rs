//! Configuration file support for the LCP identity layer
//!
//! Loads and validates LCP configuration from TOML files.
//! Default location: /etc/arca-router/lcp.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LcpError, LcpResult};
use crate::persistence::DEFAULT_MAPPING_PATH;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/arca-router/lcp.toml";

/// Environment variable overriding `persistence.mapping_path`.
pub const MAPPING_PATH_ENV: &str = "ARCA_LCP_MAPPING_PATH";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Snapshot persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON mapping snapshot
    #[serde(default = "default_mapping_path")]
    pub mapping_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete LCP configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LcpConfig {
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_mapping_path() -> PathBuf {
    PathBuf::from(DEFAULT_MAPPING_PATH)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mapping_path: default_mapping_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LcpConfig {
    /// Load configuration from file, falling back to defaults if file not found.
    ///
    /// `ARCA_LCP_MAPPING_PATH` overrides the snapshot path in either case.
    pub fn load(path: impl AsRef<Path>) -> LcpResult<Self> {
        let path = path.as_ref();

        let config = match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                LcpError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(LcpError::Configuration(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let config = config.with_mapping_path_override(std::env::var(MAPPING_PATH_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from default location or defaults
    pub fn load_default() -> LcpResult<Self> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    pub fn from_toml_str(content: &str) -> LcpResult<Self> {
        toml::from_str(content).map_err(|e| LcpError::Configuration(e.to_string()))
    }

    /// Replaces the snapshot path when `value` is set and non-empty.
    pub fn with_mapping_path_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            self.persistence.mapping_path = PathBuf::from(path);
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> LcpResult<()> {
        let path = &self.persistence.mapping_path;
        if path.as_os_str().is_empty() {
            return Err(LcpError::Configuration(
                "mapping_path must not be empty".to_string(),
            ));
        }
        if path.file_name().is_none() {
            return Err(LcpError::Configuration(format!(
                "mapping_path {} must name a file",
                path.display()
            )));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(LcpError::Configuration(format!(
                "unknown log level '{}' (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LcpConfig::default();
        assert_eq!(
            config.persistence.mapping_path,
            PathBuf::from("/var/lib/arca-router/lcp_mapping.json")
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = LcpConfig::from_toml_str(
            r#"
[persistence]
mapping_path = "/run/arca/lcp.json"

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.persistence.mapping_path, PathBuf::from("/run/arca/lcp.json"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = LcpConfig::from_toml_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.persistence, PersistenceConfig::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_toml() {
        let err = LcpConfig::from_toml_str("[persistence\nmapping_path = 1").unwrap_err();
        assert!(matches!(err, LcpError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LcpConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = LcpConfig::default();
        config.persistence.mapping_path = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = LcpConfig::default();
        config.persistence.mapping_path = PathBuf::from("/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mapping_path_override() {
        let config = LcpConfig::default().with_mapping_path_override(Some("/tmp/lcp.json".into()));
        assert_eq!(config.persistence.mapping_path, PathBuf::from("/tmp/lcp.json"));

        let config = LcpConfig::default().with_mapping_path_override(Some("  ".into()));
        assert_eq!(config.persistence, PersistenceConfig::default());

        let config = LcpConfig::default().with_mapping_path_override(None);
        assert_eq!(config.persistence, PersistenceConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lcp.toml");
        fs::write(&path, "[logging]\nlevel = \"error\"\n").unwrap();

        let config = LcpConfig::load(&path).unwrap();
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lcp.toml");
        fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

        assert!(matches!(LcpConfig::load(&path), Err(LcpError::Configuration(_))));
    }
}
