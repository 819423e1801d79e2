//! In-memory loopback transport
//!
//! Backs the agent's trait seams with tokio channels so tests can
//! play the remote endpoint without a network. Closing one side's tx
//! is observed as a clean end-of-stream on the peer's rx, matching
//! the WebSocket transport's close semantics.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use fv_core::{Channel, ChannelId, ChannelOpener, Payload, TransportError, TransportRx, TransportTx};

/// Send half backed by an mpsc sender
pub struct MemTx {
    tx: Option<mpsc::Sender<Payload>>,
}

#[async_trait]
impl TransportTx for MemTx {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(Payload::Text(text.to_string())).await
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.send(Payload::Binary(data)).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

impl MemTx {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError> {
        match &self.tx {
            Some(tx) => tx
                .send(payload)
                .await
                .map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }
}

/// Receive half backed by an mpsc receiver
pub struct MemRx {
    rx: mpsc::Receiver<Payload>,
}

#[async_trait]
impl TransportRx for MemRx {
    async fn recv(&mut self) -> Result<Option<Payload>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

/// Create a connected pair of duplex channels
pub fn pair() -> (Channel, Channel) {
    let (a_tx, b_rx) = mpsc::channel(64);
    let (b_tx, a_rx) = mpsc::channel(64);

    let a = Channel::new(Box::new(MemTx { tx: Some(a_tx) }), Box::new(MemRx { rx: a_rx }));
    let b = Channel::new(Box::new(MemTx { tx: Some(b_tx) }), Box::new(MemRx { rx: b_rx }));
    (a, b)
}

/// Opener that mints loopback channels and hands the peer end (plus
/// the correlation id) to the test through an unbounded queue.
pub struct MemOpener {
    accepted: mpsc::UnboundedSender<(ChannelId, Channel)>,
}

impl MemOpener {
    /// Create an opener and the queue of accepted peer channels
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ChannelId, Channel)>) {
        let (accepted, queue) = mpsc::unbounded_channel();
        (Self { accepted }, queue)
    }
}

#[async_trait]
impl ChannelOpener for MemOpener {
    async fn open(&self, correlation: &ChannelId) -> Result<Channel, TransportError> {
        let (ours, theirs) = pair();
        self.accepted
            .send((correlation.clone(), theirs))
            .map_err(|_| TransportError::Connect("No acceptor for side channel".to_string()))?;
        Ok(ours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_roundtrip_and_close() {
        let (mut a, mut b) = pair();

        a.tx.send_text("hello").await.unwrap();
        a.tx.send_binary(Bytes::from_static(b"\x01\x02")).await.unwrap();

        assert_eq!(b.rx.recv().await.unwrap(), Some(Payload::Text("hello".to_string())));
        assert_eq!(
            b.rx.recv().await.unwrap(),
            Some(Payload::Binary(Bytes::from_static(b"\x01\x02")))
        );

        a.tx.close().await.unwrap();
        assert_eq!(b.rx.recv().await.unwrap(), None);
        assert!(a.tx.send_text("late").await.is_err());
    }

    #[tokio::test]
    async fn test_opener_delivers_peer_with_correlation() {
        let (opener, mut queue) = MemOpener::new();

        let id = ChannelId::new("req-7");
        let mut ours = opener.open(&id).await.unwrap();
        let (peer_id, mut theirs) = queue.recv().await.unwrap();
        assert_eq!(peer_id, id);

        ours.tx.send_text("42").await.unwrap();
        assert_eq!(
            theirs.rx.recv().await.unwrap(),
            Some(Payload::Text("42".to_string()))
        );
    }
}
