//! Transport abstractions
//!
//! A transport is a duplex, message-oriented connection (text or
//! binary frames). The control connection and every side channel are
//! instances of the same abstraction, split into independently owned
//! send and receive halves so the terminal session can run its two
//! forwarding loops on separate tasks.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::types::ChannelId;

/// One received transport frame
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame
    Binary(Bytes),
}

impl Payload {
    /// Raw bytes of the frame, regardless of kind
    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Text(text) => Bytes::from(text.into_bytes()),
            Payload::Binary(data) => data,
        }
    }
}

/// Send half of a transport
#[async_trait]
pub trait TransportTx: Send {
    /// Send a UTF-8 text frame
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Send a binary frame
    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError>;

    /// Flush and close the connection
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Receive half of a transport
#[async_trait]
pub trait TransportRx: Send {
    /// Receive the next frame. `Ok(None)` means the peer closed the
    /// connection cleanly.
    async fn recv(&mut self) -> Result<Option<Payload>, TransportError>;
}

/// An established duplex connection: a (tx, rx) pair of boxed halves
pub struct Channel {
    /// Send half
    pub tx: Box<dyn TransportTx>,
    /// Receive half
    pub rx: Box<dyn TransportRx>,
}

impl Channel {
    /// Bundle two halves into a channel
    pub fn new(tx: Box<dyn TransportTx>, rx: Box<dyn TransportRx>) -> Self {
        Self { tx, rx }
    }

    /// Split into independently owned halves
    pub fn split(self) -> (Box<dyn TransportTx>, Box<dyn TransportRx>) {
        (self.tx, self.rx)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}

/// Opens side channels to the streaming endpoint.
///
/// Every side channel serves exactly one purpose (one transfer or one
/// terminal session) and is tagged with a correlation identifier the
/// remote endpoint uses to route it to the originating request.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Open a new side channel tagged with `correlation`
    async fn open(&self, correlation: &ChannelId) -> Result<Channel, TransportError>;
}
