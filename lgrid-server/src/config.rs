//! Runtime settings for lgrid-server
//!
//! Command-line flags (which clap also reads from `LGRID_*` environment
//! variables) override the TOML bootstrap file, which overrides built-in
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use lgrid_common::config::{default_database_path, resolve_api_key, KeySource, TomlConfig};

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
    pub log_level: Option<String>,
    pub public_base_url: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub anthropic_api_key: Option<String>,
    pub api_key_source: Option<KeySource>,
    pub model: String,
    pub max_tokens: u32,
    pub autosave_debounce: Duration,
    pub workspace_idle: Duration,
    pub public_base_url: String,
}

impl Settings {
    pub fn resolve(toml: TomlConfig, overrides: Overrides) -> Self {
        let (anthropic_api_key, api_key_source) = match resolve_api_key(&toml) {
            Some((key, source)) => (Some(key), Some(source)),
            None => (None, None),
        };
        let host = overrides.host.unwrap_or(toml.host);
        let port = overrides.port.unwrap_or(toml.port);
        let public_base_url = overrides
            .public_base_url
            .or(toml.public_base_url)
            .unwrap_or_else(|| format!("http://{}:{}", host, port));

        Self {
            database_path: overrides
                .database
                .or(toml.database_path)
                .unwrap_or_else(default_database_path),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
            log_file: toml.logging.file,
            anthropic_api_key,
            api_key_source,
            model: toml.model,
            max_tokens: toml.max_tokens,
            autosave_debounce: Duration::from_millis(toml.autosave_debounce_ms),
            workspace_idle: Duration::from_secs(toml.workspace_idle_secs),
            public_base_url,
            host,
            port,
        }
    }

    /// Settings for tests and embedding: defaults with the given debounce
    pub fn for_testing(autosave_debounce: Duration) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: PathBuf::from(":memory:"),
            log_level: "debug".to_string(),
            log_file: None,
            anthropic_api_key: None,
            api_key_source: None,
            model: "test-model".to_string(),
            max_tokens: 256,
            autosave_debounce,
            workspace_idle: Duration::from_secs(300),
            public_base_url: "http://lgrid.test".to_string(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
