//! adlc configuration
//!
//! Compiler settings live in a TOML file (by default `adlc.toml` next to
//! the invocation). Every field is optional; missing fields take defaults.
//!
//! ```toml
//! cutflow = "all"      # all | last | none
//! eventlist = "none"   # all | last | none
//! log_level = "info"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use adlc::util::config::load_config;
//!
//! let config = load_config("adlc.toml").unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::util::logger::LogLevel;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "adlc.toml";

/// Which regions get a cutflow or event-list report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Every region
    #[default]
    All,
    /// Only the last region in the file
    Last,
    /// No region
    None,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Cutflow reports (`DO_CUTFLOW_ON_REGION`)
    #[serde(default)]
    pub cutflow: ReportMode,
    /// Event-list reports (`DO_EVENTLIST_ON_REGION`)
    #[serde(default = "default_eventlist")]
    pub eventlist: ReportMode,
    /// Logging verbosity when none is given on the command line
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_eventlist() -> ReportMode {
    ReportMode::None
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cutflow: ReportMode::All,
            eventlist: ReportMode::None,
            log_level: LogLevel::Info,
        }
    }
}

/// Parse a configuration from TOML text
pub fn parse_config(content: &str) -> Result<CompilerConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::ParseError)
}

/// Load configuration from `path`
/// Returns default config if file doesn't exist
pub fn load_config(path: impl AsRef<Path>) -> Result<CompilerConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(CompilerConfig::default());
    }

    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    parse_config(&content)
}

/// Load configuration, writing the defaults to `path` if it does not exist
pub fn load_or_create_config(path: impl AsRef<Path>) -> Result<CompilerConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        let config = CompilerConfig::default();
        save_config(&config, path)?;
        tracing::info!("Wrote default configuration to {}", path.display());
        return Ok(config);
    }

    load_config(path)
}

/// Save configuration to `path`
pub fn save_config(
    config: &CompilerConfig,
    path: impl AsRef<Path>,
) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::IoError)?;
        }
    }

    let content = toml::to_string_pretty(config).map_err(ConfigError::SerializeError)?;
    fs::write(path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.cutflow, ReportMode::All);
        assert_eq!(config.eventlist, ReportMode::None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = parse_config("cutflow = \"last\"\n").unwrap();
        assert_eq!(config.cutflow, ReportMode::Last);
        assert_eq!(config.eventlist, ReportMode::None);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = parse_config("eventlist = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);

        let created = load_or_create_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(load_config(&path).unwrap(), created);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CompilerConfig::default());
    }
}
