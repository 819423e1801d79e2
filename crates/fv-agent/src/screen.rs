//! Screen frame pump
//!
//! Capture and encoding live outside this crate; what the agent owns
//! is the cadence and the wire: poll a [`FrameSource`] on a fixed
//! interval and forward each encoded frame as a binary payload on the
//! live-view channel. A source returning `None` means no new frame
//! this tick (unchanged screen) and sends nothing.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use fv_core::TransportTx;

/// Producer of encoded display frames
#[async_trait]
pub trait FrameSource: Send {
    /// The next encoded frame, or `None` when the display has not
    /// changed since the previous one.
    async fn next_frame(&mut self) -> Result<Option<Bytes>>;
}

/// Forward frames from `source` to `tx` at `interval` until the token
/// is cancelled or the channel fails. Ticks that fall behind are
/// skipped rather than bursted. Closes the channel on the way out.
pub async fn run_frame_pump(
    mut source: Box<dyn FrameSource>,
    mut tx: Box<dyn TransportTx>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let frame = match source.next_frame().await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!("Frame capture failed: {:#}", e);
                        continue;
                    }
                };
                if let Err(e) = tx.send_binary(frame).await {
                    tracing::debug!("Live-view channel send failed: {}", e);
                    break;
                }
            }
        }
    }

    let _ = tx.close().await;
}
