//! Agent configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration for the agent process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Control endpoint (WebSocket URL). The first message received
    /// after connect carries the session id assigned by the endpoint.
    pub accept_endpoint: String,

    /// Streaming endpoint (WebSocket URL). Side channels dial
    /// `{stream_endpoint}/{session_id}`.
    pub stream_endpoint: String,

    /// Base directory exposed to the operator as the virtual root.
    /// Defaults to the current working directory at startup.
    pub base_dir: Option<PathBuf>,

    /// Shell command override for terminal sessions. When unset, a
    /// platform default is selected at open time.
    pub shell: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            accept_endpoint: "wss://localhost/accept".to_string(),
            stream_endpoint: "wss://localhost/live".to_string(),
            base_dir: None,
            shell: None,
        }
    }
}

impl AgentConfig {
    /// Resolve the base directory, falling back to the current
    /// working directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("farview")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("agent.toml")
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config(path: &Path, config: &AgentConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}
