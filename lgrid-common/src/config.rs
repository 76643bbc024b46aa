//! Bootstrap configuration loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the server binary)
//! 2. Environment variables (`LGRID_*`)
//! 3. TOML config file (`~/.config/lgrid/lgrid-server.toml`)
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

/// Environment variable holding the Anthropic API key
pub const API_KEY_ENV: &str = "LGRID_ANTHROPIC_API_KEY";

/// Default HTTP port of lgrid-server
pub const DEFAULT_PORT: u16 = 5790;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file; defaults under the OS data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Quiet period before a workspace change is written
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// Unchanged workspaces are flushed and closed after this long
    #[serde(default = "default_workspace_idle_secs")]
    pub workspace_idle_secs: u64,

    /// Base of share URLs handed to clients
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            logging: LoggingConfig::default(),
            anthropic_api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            workspace_idle_secs: default_workspace_idle_secs(),
            public_base_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_autosave_debounce_ms() -> u64 {
    2000
}

fn default_workspace_idle_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config file path: `<config dir>/lgrid/lgrid-server.toml`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("lgrid").join("lgrid-server.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Default database location: `<data dir>/lgrid/lgrid.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lgrid"))
        .unwrap_or_else(|| PathBuf::from("./lgrid_data"))
        .join("lgrid.db")
}

/// Load a TOML config file; `None` when it does not exist
///
/// A file that exists but fails to parse is an error. Nothing is logged
/// here since this runs before tracing is set up.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    Ok(Some(config))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Where the Anthropic API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    TomlConfig,
    /// Both held a key; the environment one is used
    EnvironmentOverTomlConfig,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Environment => write!(f, "environment variable {}", API_KEY_ENV),
            KeySource::TomlConfig => write!(f, "TOML config"),
            KeySource::EnvironmentOverTomlConfig => {
                write!(f, "environment variable {} (TOML key ignored)", API_KEY_ENV)
            }
        }
    }
}

/// Resolve the Anthropic API key and its source
///
/// **Priority:** ENV → TOML. Returns `None` when neither holds a valid key.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<(String, KeySource)> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .anthropic_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(key), Some(_)) => Some((key, KeySource::EnvironmentOverTomlConfig)),
        (Some(key), None) => Some((key, KeySource::Environment)),
        (None, Some(key)) => Some((key, KeySource::TomlConfig)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_is_none() {
        let config = load_toml_config(Path::new("/nonexistent/lgrid-server.toml")).unwrap();
        assert!(config.is_none());

        let defaults = TomlConfig::default();
        assert_eq!(defaults.port, DEFAULT_PORT);
        assert_eq!(defaults.autosave_debounce_ms, 2000);
        assert_eq!(defaults.workspace_idle_secs, 300);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 6001\nautosave_debounce_ms = 500\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = load_toml_config(file.path()).unwrap().unwrap();
        assert_eq!(config.port, 6001);
        assert_eq!(config.autosave_debounce_ms, 500);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.workspace_idle_secs, 300);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        assert!(matches!(load_toml_config(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-ant-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    #[serial]
    fn test_api_key_env_wins_over_toml() {
        std::env::set_var(API_KEY_ENV, "env-key");
        let config = TomlConfig {
            anthropic_api_key: Some("toml-key".to_string()),
            ..TomlConfig::default()
        };
        assert_eq!(
            resolve_api_key(&config),
            Some(("env-key".to_string(), KeySource::EnvironmentOverTomlConfig))
        );

        assert_eq!(
            resolve_api_key(&TomlConfig::default()),
            Some(("env-key".to_string(), KeySource::Environment))
        );
        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    #[serial]
    fn test_api_key_falls_back_to_toml() {
        std::env::set_var(API_KEY_ENV, "  ");
        let config = TomlConfig {
            anthropic_api_key: Some("toml-key".to_string()),
            ..TomlConfig::default()
        };
        assert_eq!(
            resolve_api_key(&config),
            Some(("toml-key".to_string(), KeySource::TomlConfig))
        );

        std::env::remove_var(API_KEY_ENV);
        assert_eq!(resolve_api_key(&TomlConfig::default()), None);
    }
}
