//! fv-core: Core abstractions and configuration for the farview agent
//!
//! This crate provides the transport seams, domain identifiers, error
//! taxonomy, and configuration shared by the agent components.

pub mod config;
pub mod error;
pub mod paths;
pub mod transport;
pub mod types;

pub use error::{ConfigError, SessionError, TransportError};
pub use transport::{Channel, ChannelOpener, Payload, TransportRx, TransportTx};
pub use types::{ChannelId, SessionId};
