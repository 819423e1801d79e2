//! Terminal session lifecycle
//!
//! One controller per control connection owns at most one live
//! session: a PTY process plus the side channel its bytes flow over.
//! Two forwarding loops run while the session is active; either side
//! reaching end-of-stream (shell exited, channel closed) cancels the
//! shared token and drives teardown. Blocking PTY reads run on the
//! blocking pool so they never stall the scheduler.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fv_core::{ChannelId, ChannelOpener, SessionError, TransportError, TransportRx, TransportTx};
use fv_protocol::TerminalSize;

use super::pty::{default_shell, PtyProcess};

/// How long teardown waits for a pump task before detaching from it
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Lifecycle state of the terminal subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session exists
    Idle,
    /// A session is being set up
    Opening,
    /// Forwarding loops are running
    Active,
    /// Teardown in progress
    Closing,
    /// Session ended; a new `open` may follow
    Closed,
}

struct ActiveSession {
    pty: Arc<Mutex<PtyProcess>>,
    cancel: CancellationToken,
    pumps: Vec<JoinHandle<()>>,
    reaper: JoinHandle<()>,
    size: TerminalSize,
}

/// Owner of the at-most-one terminal session per control connection.
///
/// All lifecycle transitions go through this single owner; the pump
/// tasks only ever touch the halves handed to them at open time.
pub struct TerminalController {
    opener: Arc<dyn ChannelOpener>,
    base: PathBuf,
    shell_override: Option<String>,
    active: Option<ActiveSession>,
    state: SessionState,
}

impl TerminalController {
    /// Create an idle controller
    pub fn new(
        opener: Arc<dyn ChannelOpener>,
        base: PathBuf,
        shell_override: Option<String>,
    ) -> Self {
        Self {
            opener,
            base,
            shell_override,
            active: None,
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state. A session whose token was cancelled
    /// by a pump (shell exit, channel closure) reports `Closing` while
    /// its tasks drain and `Closed` once they have all finished.
    pub fn state(&self) -> SessionState {
        match &self.active {
            Some(session) if session.cancel.is_cancelled() => {
                if session.reaper.is_finished()
                    && session.pumps.iter().all(|pump| pump.is_finished())
                {
                    SessionState::Closed
                } else {
                    SessionState::Closing
                }
            }
            Some(_) => SessionState::Active,
            None => self.state,
        }
    }

    /// Window size of the live session, if any
    pub fn size(&self) -> Option<TerminalSize> {
        self.active.as_ref().map(|s| s.size)
    }

    /// Shell pid of the live session, if any
    pub fn pid(&self) -> Option<u32> {
        let session = self.active.as_ref()?;
        session.pty.lock().unwrap_or_else(|e| e.into_inner()).pid()
    }

    /// Start a new session, fully closing any existing one first.
    ///
    /// On failure at any step, no partial session is left running:
    /// the side channel is closed and the controller ends up `Closed`.
    pub async fn open(&mut self, size: TerminalSize) -> Result<(), SessionError> {
        // Replacement semantics: old session is torn down in order
        // before the new PTY is spawned
        self.close().await;
        self.state = SessionState::Opening;

        let correlation = ChannelId::random();
        let channel = match self.opener.open(&correlation).await {
            Ok(channel) => channel,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(SessionError::ChannelOpen(e));
            }
        };

        let shell = self
            .shell_override
            .clone()
            .unwrap_or_else(default_shell);

        let (pty, reader, writer) = match PtyProcess::spawn(&shell, &self.base, size) {
            Ok(spawned) => spawned,
            Err(e) => {
                let (mut tx, _rx) = channel.split();
                let _ = tx.close().await;
                self.state = SessionState::Closed;
                return Err(e);
            }
        };

        let (mut tx, rx) = channel.split();

        // Reset the operator's viewport and name the window after the
        // shell, ahead of the first shell output. Best effort; a dead
        // channel is caught by the pumps right after.
        if let Err(e) = send_greeting(tx.as_mut(), &shell).await {
            tracing::debug!("Terminal greeting not delivered: {}", e);
        }

        let cancel = CancellationToken::new();
        let pty = Arc::new(Mutex::new(pty));

        // PTY -> channel: blocking reads off-loop, forwarded through
        // an mpsc into the async sender
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(64);
        let reader_task = spawn_pty_reader(reader, out_tx, cancel.clone());
        let output_pump = tokio::spawn(run_output_pump(out_rx, tx, cancel.clone()));

        // Channel -> PTY
        let input_pump = tokio::spawn(run_input_pump(rx, writer, cancel.clone()));

        // Reaps the child as soon as anything cancels the token, so a
        // shell that exits (or a channel that drops) never leaves an
        // orphan even if no further control commands arrive
        let reaper = tokio::spawn(run_reaper(Arc::clone(&pty), cancel.clone()));

        self.active = Some(ActiveSession {
            pty,
            cancel,
            pumps: vec![reader_task, output_pump, input_pump],
            reaper,
            size,
        });
        self.state = SessionState::Active;
        Ok(())
    }

    /// Resize the live session's window in place
    pub fn sync(&mut self, size: TerminalSize) -> Result<(), SessionError> {
        let session = self.active.as_mut().ok_or(SessionError::NotActive)?;
        if session.cancel.is_cancelled() {
            return Err(SessionError::NotActive);
        }

        session
            .pty
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .resize(size)?;
        session.size = size;
        Ok(())
    }

    /// Tear the session down: terminate and reap the shell, cancel
    /// both forwarding loops, close the side channel. No-op when no
    /// session exists.
    pub async fn close(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };
        self.state = SessionState::Closing;

        session.cancel.cancel();

        // The reaper kills and waits for the child; give it a moment,
        // then make sure ourselves
        if tokio::time::timeout(PUMP_JOIN_TIMEOUT, session.reaper)
            .await
            .is_err()
        {
            tracing::warn!("Reaper did not finish in time; reaping inline");
        }
        let pty = session.pty;
        let _ = tokio::task::spawn_blocking(move || {
            pty.lock().unwrap_or_else(|e| e.into_inner()).terminate()
        })
        .await;

        // Pumps exit once the token is cancelled and the PTY is gone;
        // a reader stuck past the timeout unblocks at PTY EOF
        for pump in session.pumps {
            if tokio::time::timeout(PUMP_JOIN_TIMEOUT, pump).await.is_err() {
                tracing::debug!("Detaching from slow pump task");
            }
        }

        self.state = SessionState::Closed;
        tracing::info!("Terminal session closed");
    }
}

/// Clear the operator's screen and set the window title to the shell
/// name. Sent as the first frames of every session.
async fn send_greeting(tx: &mut dyn TransportTx, shell: &str) -> Result<(), TransportError> {
    tx.send_binary(Bytes::from_static(b"\x1b[2J\x1b[A\x1b[A"))
        .await?;
    tx.send_binary(Bytes::from(format!("\x1b]0;{}\x07", shell)))
        .await
}

/// Blocking PTY read loop on the blocking pool. Exits on EOF (shell
/// gone), read error, cancellation, or the forwarding side dropping.
fn spawn_pty_reader(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match reader.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("PTY reader reached EOF");
                    break;
                }
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    if !cancel.is_cancelled() {
                        tracing::debug!("PTY read ended: {}", e);
                    }
                    break;
                }
            }
        }
    })
}

/// Forward PTY output chunks to the side channel in arrival order.
/// Ends on cancellation, reader EOF, or channel send failure; always
/// closes the channel and cancels the session on the way out.
async fn run_output_pump(
    mut source: mpsc::Receiver<Vec<u8>>,
    mut tx: Box<dyn TransportTx>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = source.recv() => match chunk {
                Some(data) => {
                    if let Err(e) = tx.send_binary(data.into()).await {
                        tracing::debug!("Terminal channel send failed: {}", e);
                        break;
                    }
                }
                // Reader finished: the shell exited
                None => break,
            },
        }
    }

    let _ = tx.close().await;
    cancel.cancel();
}

/// Forward side-channel frames into the PTY in arrival order. Ends on
/// cancellation, channel closure, or PTY write failure.
async fn run_input_pump(
    mut rx: Box<dyn TransportRx>,
    mut writer: Box<dyn Write + Send>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = rx.recv() => match frame {
                Ok(Some(payload)) => {
                    let data = payload.into_bytes();
                    // PTY writes are small and kernel-buffered
                    if let Err(e) = writer.write_all(&data).and_then(|_| writer.flush()) {
                        tracing::debug!("PTY write failed: {}", e);
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("Terminal channel closed by peer");
                    break;
                }
                Err(e) => {
                    tracing::debug!("Terminal channel receive failed: {}", e);
                    break;
                }
            },
        }
    }

    cancel.cancel();
}

/// Kill and reap the child as soon as the session token is cancelled,
/// whatever cancelled it. Keeps the no-orphan guarantee independent
/// of the control loop's lifetime.
async fn run_reaper(pty: Arc<Mutex<PtyProcess>>, cancel: CancellationToken) {
    cancel.cancelled().await;
    let _ = tokio::task::spawn_blocking(move || {
        pty.lock().unwrap_or_else(|e| e.into_inner()).terminate()
    })
    .await;
}
