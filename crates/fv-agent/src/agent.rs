//! Agent session runner
//!
//! One call to [`run`] is one agent session: dial the control
//! endpoint, take the session id from the hello frame, start the
//! optional live-view frame pump, then hand the connection to the
//! command dispatcher until it ends. Reconnection policy belongs to
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use fv_core::config::AgentConfig;
use fv_core::{ChannelId, ChannelOpener, Payload, SessionId};
use fv_protocol::SessionHello;

use crate::dispatch::{Dispatcher, DisconnectReason};
use crate::input::InputInjector;
use crate::screen::{self, FrameSource};
use crate::transport::{self, WsOpener};

/// Live-view frame cadence (10 fps nominal; slow sources skip ticks)
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Run one agent session against the configured endpoints. Returns
/// once the control connection ends, after tearing down any live
/// terminal session and the frame pump.
pub async fn run(
    config: &AgentConfig,
    injector: Arc<dyn InputInjector>,
    frames: Option<Box<dyn FrameSource>>,
) -> Result<DisconnectReason> {
    let mut control = transport::connect(&config.accept_endpoint)
        .await
        .with_context(|| format!("connect to {}", config.accept_endpoint))?;
    tracing::info!("Control connection established to {}", config.accept_endpoint);

    // The endpoint speaks first: the hello frame assigns our session id
    let hello = match control.rx.recv().await? {
        Some(Payload::Text(frame)) => {
            serde_json::from_str::<SessionHello>(&frame).context("malformed session hello")?
        }
        Some(Payload::Binary(_)) => bail!("Unexpected binary frame before session hello"),
        None => bail!("Connection closed before session hello"),
    };
    let session_id = SessionId::new(hello.id);
    tracing::info!("Session {} accepted", session_id);

    let opener = Arc::new(WsOpener::new(
        config.stream_endpoint.clone(),
        session_id.clone(),
    ));

    // Live view is best-effort; a failed channel never blocks commands
    let pump_cancel = CancellationToken::new();
    let pump = match frames {
        Some(source) => match opener.open(&ChannelId::new("live")).await {
            Ok(channel) => {
                let (tx, _rx) = channel.split();
                Some(tokio::spawn(screen::run_frame_pump(
                    source,
                    tx,
                    FRAME_INTERVAL,
                    pump_cancel.clone(),
                )))
            }
            Err(e) => {
                tracing::warn!("Live-view channel open failed: {}", e);
                None
            }
        },
        None => None,
    };

    let dispatcher = Dispatcher::new(
        control,
        opener as Arc<dyn ChannelOpener>,
        config.base_dir(),
        config.shell.clone(),
        injector,
    );
    let reason = dispatcher.run().await;
    tracing::info!("Control connection ended: {:?}", reason);

    pump_cancel.cancel();
    if let Some(pump) = pump {
        let _ = pump.await;
    }

    Ok(reason)
}
