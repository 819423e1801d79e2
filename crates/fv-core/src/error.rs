//! Core error types for the farview agent

use std::path::PathBuf;
use thiserror::Error;

/// Transport-level errors (control connection and side channels)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection could not be established
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Connection broke mid-stream
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Send on a closed connection
    #[error("Connection closed")]
    Closed,
}

/// Terminal-session errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// PTY allocation failed
    #[error("PTY allocation failed: {0}")]
    PtyAllocation(String),

    /// Shell could not be spawned
    #[error("Failed to spawn shell '{shell}': {reason}")]
    ShellSpawn { shell: String, reason: String },

    /// Side channel for the session could not be opened
    #[error("Terminal channel open failed: {0}")]
    ChannelOpen(#[from] TransportError),

    /// Window-size update failed
    #[error("Resize failed: {0}")]
    Resize(String),

    /// Resize of an inactive session
    #[error("No active terminal session")]
    NotActive,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
