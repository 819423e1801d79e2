//! Transport implementations
//!
//! `ws` is the production WebSocket transport; `mem` is an in-memory
//! loopback used by tests to drive the agent through the same trait
//! seams the real transport uses.

pub mod mem;
pub mod ws;

pub use ws::{connect, WsOpener};
