//! Control connection dispatcher
//!
//! Single-threaded command loop over the control channel: decode each
//! text frame, execute the command, reply where the protocol calls for
//! one. Filesystem commands run to completion before the next frame is
//! read; downloads run as detached tasks on their own side channels;
//! terminal actions drive the one [`TerminalController`].
//!
//! Per-command failures (bad path, malformed frame, injection error)
//! are answered or logged and the loop keeps running. Only the control
//! transport itself ending stops the loop.

use std::path::PathBuf;
use std::sync::Arc;

use fv_core::{paths, Channel, ChannelOpener, Payload, TransportError, TransportRx, TransportTx};
use fv_protocol::{Request, Response, TerminalAction, TerminalSize};

use crate::fsops;
use crate::input::{self, InputInjector};
use crate::terminal::TerminalController;
use crate::transfer;

/// Why the control loop ended
#[derive(Debug)]
pub enum DisconnectReason {
    /// The remote endpoint closed the connection cleanly
    PeerClosed,
    /// The transport failed mid-session
    Transport(TransportError),
}

/// Command loop over one control connection
pub struct Dispatcher {
    tx: Box<dyn TransportTx>,
    rx: Box<dyn TransportRx>,
    opener: Arc<dyn ChannelOpener>,
    base: PathBuf,
    injector: Arc<dyn InputInjector>,
    terminal: TerminalController,
}

impl Dispatcher {
    /// Build a dispatcher for an established control channel
    pub fn new(
        control: Channel,
        opener: Arc<dyn ChannelOpener>,
        base: PathBuf,
        shell_override: Option<String>,
        injector: Arc<dyn InputInjector>,
    ) -> Self {
        let (tx, rx) = control.split();
        let terminal = TerminalController::new(Arc::clone(&opener), base.clone(), shell_override);
        Self {
            tx,
            rx,
            opener,
            base,
            injector,
            terminal,
        }
    }

    /// Run until the control connection ends. Any live terminal
    /// session is torn down before returning, whatever the reason.
    pub async fn run(mut self) -> DisconnectReason {
        let reason = loop {
            match self.rx.recv().await {
                Ok(Some(Payload::Text(frame))) => {
                    let request = match Request::decode(&frame) {
                        Ok(request) => request,
                        Err(e) => {
                            tracing::warn!("Skipping malformed control frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = self.handle(request).await {
                        break DisconnectReason::Transport(e);
                    }
                }
                Ok(Some(Payload::Binary(_))) => {
                    tracing::warn!("Skipping unexpected binary control frame");
                }
                Ok(None) => break DisconnectReason::PeerClosed,
                Err(e) => break DisconnectReason::Transport(e),
            }
        };

        self.terminal.close().await;
        reason
    }

    /// Execute one command. `Err` means the control transport itself
    /// failed while replying; command-level failures are absorbed here.
    async fn handle(&mut self, request: Request) -> Result<(), TransportError> {
        match request {
            Request::Ls { request_id, path } => {
                let target = paths::resolve_virtual(&self.base, &path);
                let contents = tokio::task::spawn_blocking(move || fsops::list_dir(&target))
                    .await
                    .unwrap_or_else(|e| Err(e.into()))
                    .unwrap_or_else(|e| {
                        tracing::warn!("Listing failed: {:#}", e);
                        Vec::new()
                    });

                self.reply(&Response::Ls {
                    request_id,
                    path,
                    contents,
                })
                .await
            }

            Request::Rm { request_id, path } => {
                let target = paths::resolve_virtual(&self.base, &path);
                let success = tokio::task::spawn_blocking(move || fsops::remove_to_trash(&target))
                    .await
                    .unwrap_or_else(|e| Err(e.into()))
                    .map_err(|e| tracing::warn!("Trash failed: {:#}", e))
                    .is_ok();

                self.reply(&Response::Rm {
                    request_id,
                    success,
                })
                .await
            }

            Request::Mv {
                request_id,
                url,
                destination_url,
            } => {
                let source = paths::resolve_virtual(&self.base, &url);
                let destination = paths::resolve_virtual(&self.base, &destination_url);
                let success = match tokio::fs::rename(&source, &destination).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Move {:?} -> {:?} failed: {}", source, destination, e);
                        false
                    }
                };

                self.reply(&Response::Mv {
                    request_id,
                    success,
                })
                .await
            }

            Request::MouseClick { point, aux } => {
                if let Err(e) = input::apply_mouse_click(self.injector.as_ref(), point, aux) {
                    tracing::warn!("Mouse click failed: {:#}", e);
                }
                Ok(())
            }

            Request::Keypress { event } => {
                if let Err(e) = input::apply_key_event(self.injector.as_ref(), &event) {
                    tracing::warn!("Key injection failed: {:#}", e);
                }
                Ok(())
            }

            Request::Download { request_id, url } => {
                tokio::spawn(transfer::run_download(
                    Arc::clone(&self.opener),
                    self.base.clone(),
                    request_id,
                    url,
                ));
                Ok(())
            }

            Request::Terminal { event } => {
                match event {
                    TerminalAction::Open { columns, lines } => {
                        if let Err(e) = self.terminal.open(TerminalSize::new(columns, lines)).await
                        {
                            tracing::error!("Terminal open failed: {}", e);
                        }
                    }
                    TerminalAction::Sync { columns, lines } => {
                        if let Err(e) = self.terminal.sync(TerminalSize::new(columns, lines)) {
                            tracing::warn!("Terminal resize failed: {}", e);
                        }
                    }
                    TerminalAction::Close => self.terminal.close().await,
                }
                Ok(())
            }
        }
    }

    async fn reply(&mut self, response: &Response) -> Result<(), TransportError> {
        let frame = match response.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Response encoding failed: {}", e);
                return Ok(());
            }
        };
        self.tx.send_text(&frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NullInjector;
    use crate::transport::mem::{self, MemOpener};
    use serde_json::Value;

    struct Harness {
        peer: Channel,
        loop_task: tokio::task::JoinHandle<DisconnectReason>,
        _dir: tempfile::TempDir,
    }

    fn start() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"bb").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let (control, peer) = mem::pair();
        let (opener, _queue) = MemOpener::new();
        let dispatcher = Dispatcher::new(
            control,
            Arc::new(opener),
            dir.path().to_path_buf(),
            None,
            Arc::new(NullInjector),
        );

        Harness {
            peer,
            loop_task: tokio::spawn(dispatcher.run()),
            _dir: dir,
        }
    }

    async fn request(peer: &mut Channel, frame: &str) -> Value {
        peer.tx.send_text(frame).await.unwrap();
        match peer.rx.recv().await.unwrap() {
            Some(Payload::Text(reply)) => serde_json::from_str(&reply).unwrap(),
            other => panic!("Expected text reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ls_lists_folders_before_files() {
        let mut h = start();

        let reply = request(
            &mut h.peer,
            r#"{"request":"ls","requestId":"r1","path":"root"}"#,
        )
        .await;

        assert_eq!(reply["event"], "ls");
        assert_eq!(reply["requestId"], "r1");
        assert_eq!(reply["path"], "root");
        let names: Vec<&str> = reply["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["sub", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_ls_missing_directory_answers_empty() {
        let mut h = start();

        let reply = request(
            &mut h.peer,
            r#"{"request":"ls","requestId":"r2","path":"root/ghost"}"#,
        )
        .await;

        assert_eq!(reply["requestId"], "r2");
        assert_eq!(reply["contents"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_rm_missing_path_answers_failure() {
        let mut h = start();

        let reply = request(
            &mut h.peer,
            r#"{"request":"rm","requestId":"r3","path":"root/ghost.txt"}"#,
        )
        .await;

        assert_eq!(reply["event"], "rm");
        assert_eq!(reply["success"], false);
    }

    #[tokio::test]
    async fn test_mv_renames_and_reports_success() {
        let mut h = start();

        let reply = request(
            &mut h.peer,
            r#"{"request":"mv","requestId":"r4","url":"root/a.txt","destinationUrl":"root/sub/a.txt"}"#,
        )
        .await;
        assert_eq!(reply["success"], true);

        // Source gone, destination present
        let reply = request(
            &mut h.peer,
            r#"{"request":"ls","requestId":"r5","path":"root/sub"}"#,
        )
        .await;
        let names: Vec<&str> = reply["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let mut h = start();

        h.peer.tx.send_text("not json at all").await.unwrap();
        h.peer
            .tx
            .send_text(r#"{"request":"format_c","requestId":"x"}"#)
            .await
            .unwrap();

        // The loop is still alive and answering
        let reply = request(
            &mut h.peer,
            r#"{"request":"ls","requestId":"r6","path":"root"}"#,
        )
        .await;
        assert_eq!(reply["requestId"], "r6");
    }

    #[tokio::test]
    async fn test_peer_close_ends_loop() {
        let mut h = start();

        h.peer.tx.close().await.unwrap();
        let reason = h.loop_task.await.unwrap();
        assert!(matches!(reason, DisconnectReason::PeerClosed));
    }
}
