//! Interactive terminal subsystem
//!
//! `pty` wraps the platform pseudo-terminal (portable-pty selects the
//! POSIX or ConPTY backend); `session` owns the lifecycle state
//! machine and the two forwarding loops between the PTY and its side
//! channel.

pub mod pty;
pub mod session;

pub use pty::{default_shell, PtyProcess};
pub use session::{SessionState, TerminalController};
