//! WebSocket transport
//!
//! Thin wrapper around `tokio-tungstenite` exposing the split
//! sink/stream halves through the `fv-core` transport traits. All
//! WebSocket consumers in the crate go through this module rather
//! than `tokio-tungstenite` directly.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use fv_core::{Channel, ChannelId, ChannelOpener, Payload, SessionId, TransportError, TransportTx, TransportRx};
use fv_protocol::CHANNEL_HEADER;

/// Concrete WebSocket stream type
type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Send half of a WebSocket connection
pub struct WsTx {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportTx for WsTx {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.sink
            .send(Message::Binary(data.to_vec()))
            .await
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))
    }
}

/// Receive half of a WebSocket connection
pub struct WsRx {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl TransportRx for WsRx {
    async fn recv(&mut self) -> Result<Option<Payload>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Payload::Text(text))),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(Payload::Binary(Bytes::from(data))))
                }
                // Control frames are handled by the library; skip them
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Err(e)) => return Err(TransportError::ConnectionLost(e.to_string())),
            }
        }
    }
}

/// Establish a plain WebSocket connection
pub async fn connect(url: &str) -> Result<Channel, TransportError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    Ok(wrap(stream))
}

/// Establish a WebSocket connection tagged with a side-channel
/// correlation identifier.
async fn connect_tagged(url: &str, correlation: &ChannelId) -> Result<Channel, TransportError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    let value = correlation
        .as_str()
        .parse()
        .map_err(|_| TransportError::Connect(format!("Invalid correlation id: {}", correlation)))?;
    request.headers_mut().insert(CHANNEL_HEADER, value);

    let (stream, _response) = connect_async(request)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    Ok(wrap(stream))
}

fn wrap(stream: WsStream) -> Channel {
    let (sink, stream) = stream.split();
    Channel::new(Box::new(WsTx { sink }), Box::new(WsRx { stream }))
}

/// Opens side channels against the streaming endpoint.
///
/// Dials `{stream_endpoint}/{session_id}` and tags the handshake with
/// the correlation identifier so the remote endpoint can associate
/// the channel with the request that caused it to open.
#[derive(Debug, Clone)]
pub struct WsOpener {
    stream_endpoint: String,
    session_id: SessionId,
}

impl WsOpener {
    /// Create an opener for one agent session
    pub fn new(stream_endpoint: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            stream_endpoint: stream_endpoint.into(),
            session_id,
        }
    }
}

#[async_trait]
impl ChannelOpener for WsOpener {
    async fn open(&self, correlation: &ChannelId) -> Result<Channel, TransportError> {
        let url = format!(
            "{}/{}",
            self.stream_endpoint.trim_end_matches('/'),
            self.session_id
        );
        tracing::debug!("Opening side channel {} to {}", correlation, url);
        connect_tagged(&url, correlation).await
    }
}
