//! PTY process management
//!
//! Spawns the shell inside a pseudo-terminal using the portable-pty
//! crate, which provides the platform backend (POSIX pty vs. ConPTY)
//! behind one interface. Exactly one PTY process exists per terminal
//! session and is exclusively owned by it.

use std::io::{Read, Write};
use std::path::Path;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};

use fv_core::SessionError;
use fv_protocol::TerminalSize;

/// Select the platform default shell, mirroring what an interactive
/// login on the machine would get.
pub fn default_shell() -> String {
    if cfg!(windows) {
        "cmd.exe".to_string()
    } else if cfg!(target_os = "macos") {
        if Path::new("/bin/zsh").exists() {
            "zsh".to_string()
        } else {
            "bash".to_string()
        }
    } else {
        "bash".to_string()
    }
}

/// A pseudo-terminal with its attached child shell.
///
/// The reader and writer halves are handed out at spawn time and move
/// into the forwarding loops; the process itself retains the master
/// (for resize) and the child handle (for terminate/reap).
pub struct PtyProcess {
    master: Box<dyn portable_pty::MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
    shell: String,
    exit_code: Option<i32>,
}

impl PtyProcess {
    /// Spawn `shell` inside a fresh PTY rooted at `cwd` with the
    /// requested window size. Returns the process plus its byte-stream
    /// reader and writer.
    pub fn spawn(
        shell: &str,
        cwd: &Path,
        size: TerminalSize,
    ) -> Result<(Self, Box<dyn Read + Send>, Box<dyn Write + Send>), SessionError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(size))
            .map_err(|e| SessionError::PtyAllocation(e.to_string()))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.cwd(cwd);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SessionError::ShellSpawn {
                shell: shell.to_string(),
                reason: e.to_string(),
            })?;
        // The child holds its own slave handle now
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SessionError::PtyAllocation(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SessionError::PtyAllocation(e.to_string()))?;

        tracing::info!(
            "Spawned shell {} (pid {:?}) at {:?}",
            shell,
            child.process_id(),
            cwd
        );

        let process = Self {
            master: pair.master,
            child,
            shell: shell.to_string(),
            exit_code: None,
        };
        Ok((process, reader, writer))
    }

    /// Update the window size in place. A resize is a single call on
    /// the master side and does not disturb in-flight reads or writes
    /// on the stream halves.
    pub fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        self.master
            .resize(pty_size(size))
            .map_err(|e| SessionError::Resize(e.to_string()))
    }

    /// Kill the child (if still running) and reap it. Idempotent;
    /// returns the exit code once known.
    pub fn terminate(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }

        if let Err(e) = self.child.kill() {
            tracing::debug!("Kill failed (process likely exited): {}", e);
        }
        match self.child.wait() {
            Ok(status) => {
                let code = status.exit_code() as i32;
                tracing::info!("Shell {} exited with code {}", self.shell, code);
                self.exit_code = Some(code);
            }
            Err(e) => {
                tracing::warn!("Failed to reap shell {}: {}", self.shell, e);
                self.exit_code = Some(-1);
            }
        }
        self.exit_code
    }

    /// OS process id of the shell, if available
    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }
}

fn pty_size(size: TerminalSize) -> PtySize {
    PtySize {
        rows: size.lines,
        cols: size.columns,
        pixel_width: 0,
        pixel_height: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell_is_nonempty() {
        assert!(!default_shell().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_resize_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pty, _reader, _writer) =
            PtyProcess::spawn("/bin/sh", dir.path(), TerminalSize::new(80, 24)).unwrap();

        assert!(pty.pid().is_some());
        pty.resize(TerminalSize::new(100, 40)).unwrap();

        let first = pty.terminate();
        assert!(first.is_some());
        // Second terminate is a no-op returning the same code
        assert_eq!(pty.terminate(), first);
    }
}
