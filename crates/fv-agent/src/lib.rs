//! fv-agent: the farview remote-session agent
//!
//! A process running on a controlled machine that exposes filesystem
//! browsing, input injection, file transfer and an interactive shell
//! to a remote operator. One persistent control connection carries
//! structured command/response messages; bulk transfers and terminal
//! sessions each run on their own dedicated side channel, correlated
//! to the control connection by an identifier sent at handshake time.

pub mod agent;
pub mod dispatch;
pub mod fsops;
pub mod input;
pub mod screen;
pub mod terminal;
pub mod transfer;
pub mod transport;

pub use agent::run;
pub use dispatch::{Dispatcher, DisconnectReason};
