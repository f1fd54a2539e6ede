//! Server configuration types and loading

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "QUESTING_CONFIG";

/// Project-local config file
pub const LOCAL_CONFIG: &str = "questing.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding `entities.toml`, `ores.toml` and `quests/`
    pub data_dir: PathBuf,

    pub database_url: String,

    /// Seconds between saves of dirty quests
    pub autosave_secs: u64,

    /// Reload quest definitions when files change
    pub hot_reload: bool,

    /// Default tracing directive, added on top of RUST_LOG
    pub log_filter: String,

    /// Newline-delimited JSON input, `-` for stdin
    pub events: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_url: "sqlite:questing.db?mode=rwc".to_string(),
            autosave_secs: 30,
            hot_reload: true,
            log_filter: "questing_tasks=info".to_string(),
            events: "-".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration with fallback chain: explicit path (argument, then
    /// `QUESTING_CONFIG`), then `./questing.toml`, then defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self, TaskError> {
        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        // An explicit path must load
        if let Some(path) = explicit {
            return Self::load_from_file(&path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, TaskError> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
        let config = Self::from_toml(&content).map_err(|e| TaskError::parse(path, e))?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read events from stdin rather than a file
    pub fn events_from_stdin(&self) -> bool {
        self.events == "-"
    }

    pub fn autosave_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.autosave_secs.max(1))
    }
}
