//! Side-channel wire constants
//!
//! Side channels carry either one bulk transfer or one terminal
//! stream. A transfer channel sends the total byte count as a text
//! frame first, then raw binary chunks until the count is reached.
//! A terminal channel carries raw bytes in both directions with no
//! framing beyond the transport's own message boundaries.

/// Maximum size of one binary chunk on a transfer channel (1 MiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Handshake header carrying the correlation identifier of a side
/// channel, so the remote endpoint can route it to the request (or
/// terminal session) that opened it.
pub const CHANNEL_HEADER: &str = "X-Stream-Channel";

/// Placeholder path segment the operator uses in place of the agent's
/// real base directory.
pub const VIRTUAL_ROOT: &str = "root";
