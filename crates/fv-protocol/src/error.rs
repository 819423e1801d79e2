//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding or encoding control messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Malformed or unknown control message
    #[error("Malformed control message: {0}")]
    Json(#[from] serde_json::Error),
}
