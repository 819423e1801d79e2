//! Terminal session lifecycle against a real shell.
//!
//! Drives a `TerminalController` over the in-memory transport with an
//! actual `/bin/sh` inside a PTY, playing the remote endpoint on the
//! peer end of each side channel.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use fv_agent::terminal::{SessionState, TerminalController};
use fv_agent::transport::mem::MemOpener;
use fv_core::Channel;
use fv_protocol::TerminalSize;

const SHELL: &str = "/bin/sh";

fn controller(base: &std::path::Path) -> (TerminalController, tokio::sync::mpsc::UnboundedReceiver<(fv_core::ChannelId, Channel)>) {
    let (opener, accepted) = MemOpener::new();
    let controller = TerminalController::new(
        Arc::new(opener),
        base.to_path_buf(),
        Some(SHELL.to_string()),
    );
    (controller, accepted)
}

/// Read binary frames from the peer end until the accumulated output
/// contains `needle`.
async fn read_until(peer: &mut Channel, needle: &str) -> String {
    let mut output = String::new();
    let deadline = Duration::from_secs(10);

    loop {
        let frame = tokio::time::timeout(deadline, peer.rx.recv())
            .await
            .expect("timed out waiting for terminal output")
            .expect("terminal channel errored");
        match frame {
            Some(payload) => {
                output.push_str(&String::from_utf8_lossy(&payload.into_bytes()));
                if output.contains(needle) {
                    return output;
                }
            }
            None => panic!("terminal channel closed before {:?} appeared", needle),
        }
    }
}

/// Wait for the peer end to observe the channel closing.
async fn read_until_closed(peer: &mut Channel) {
    let deadline = Duration::from_secs(10);
    loop {
        let frame = tokio::time::timeout(deadline, peer.rx.recv())
            .await
            .expect("timed out waiting for channel close");
        match frame {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return,
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_forwards_bytes_both_ways() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    controller.open(TerminalSize::default()).await.unwrap();
    assert_eq!(controller.state(), SessionState::Active);
    assert!(controller.pid().is_some());

    let (_id, mut peer) = accepted.recv().await.unwrap();
    peer.tx.send_text("echo farview_ok\n").await.unwrap();
    let output = read_until(&mut peer, "farview_ok").await;
    assert!(output.contains("farview_ok"));

    controller.close().await;
    assert_eq!(controller.state(), SessionState::Closed);
    read_until_closed(&mut peer).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reopen_replaces_previous_session() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    controller.open(TerminalSize::default()).await.unwrap();
    let (first_id, mut first_peer) = accepted.recv().await.unwrap();
    let first_pid = controller.pid();

    controller.open(TerminalSize::default()).await.unwrap();
    let (second_id, mut second_peer) = accepted.recv().await.unwrap();

    // Each session runs on its own correlated channel
    assert_ne!(first_id, second_id);
    // The first session's shell was torn down and its channel closed
    read_until_closed(&mut first_peer).await;

    assert_eq!(controller.state(), SessionState::Active);
    assert_ne!(controller.pid(), None);
    assert_ne!(controller.pid(), first_pid);

    second_peer.tx.send_text("echo second\n").await.unwrap();
    read_until(&mut second_peer, "second").await;

    controller.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_greets_with_clear_and_title() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    controller.open(TerminalSize::default()).await.unwrap();
    let (_id, mut peer) = accepted.recv().await.unwrap();

    // The first two frames reset the viewport and set the window
    // title, ahead of any shell output
    let first = peer.rx.recv().await.unwrap().unwrap().into_bytes();
    assert_eq!(&first[..], b"\x1b[2J\x1b[A\x1b[A");
    let second = peer.rx.recv().await.unwrap().unwrap().into_bytes();
    assert_eq!(&second[..], format!("\x1b]0;{}\x07", SHELL).as_bytes());

    controller.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resize_mid_stream_preserves_output_order() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    controller.open(TerminalSize::default()).await.unwrap();
    let (_id, mut peer) = accepted.recv().await.unwrap();

    // The quoting keeps the echoed command line from matching the
    // marker before the command has actually run
    peer.tx
        .send_text("seq 1 200 && echo SEQ_''DONE\n")
        .await
        .unwrap();

    // Resize while the sequence is still streaming
    let head = read_until(&mut peer, "\n50\r").await;
    controller.sync(TerminalSize::new(100, 40)).unwrap();
    let tail = read_until(&mut peer, "SEQ_DONE").await;

    // Every line made it across the resize boundary, in order, with
    // nothing dropped or duplicated out of sequence
    let output = format!("{}{}", head, tail);
    let mut pos = 0;
    for n in 1..=200 {
        let needle = format!("\n{}\r", n);
        let found = output[pos..]
            .find(&needle)
            .unwrap_or_else(|| panic!("line {} missing or out of order", n));
        pos += found + needle.len();
    }

    // The pumps are still live after the resize
    assert_eq!(controller.size(), Some(TerminalSize::new(100, 40)));
    peer.tx.send_text("echo AFTER_''MARK\n").await.unwrap();
    read_until(&mut peer, "AFTER_MARK").await;

    controller.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shell_exit_settles_state_at_closed() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    controller.open(TerminalSize::default()).await.unwrap();
    let (_id, mut peer) = accepted.recv().await.unwrap();

    // The shell leaves on its own; no close command arrives
    peer.tx.send_text("exit\n").await.unwrap();
    read_until_closed(&mut peer).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while controller.state() != SessionState::Closed {
        assert!(
            tokio::time::Instant::now() < deadline,
            "state stuck at {:?}",
            controller.state()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    // Close with no session is a no-op
    controller.close().await;
    assert_eq!(controller.state(), SessionState::Idle);

    controller.open(TerminalSize::default()).await.unwrap();
    let (_id, _peer) = accepted.recv().await.unwrap();

    controller.close().await;
    controller.close().await;
    assert_eq!(controller.state(), SessionState::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_resizes_active_session_only() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, mut accepted) = controller(dir.path());

    assert!(controller.sync(TerminalSize::new(100, 40)).is_err());

    controller.open(TerminalSize::default()).await.unwrap();
    let (_id, _peer) = accepted.recv().await.unwrap();

    controller.sync(TerminalSize::new(100, 40)).unwrap();
    assert_eq!(controller.size(), Some(TerminalSize::new(100, 40)));

    controller.close().await;
    assert!(controller.sync(TerminalSize::new(80, 24)).is_err());
}
