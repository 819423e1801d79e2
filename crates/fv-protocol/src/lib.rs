//! fv-protocol: Control-plane wire types for the farview agent
//!
//! This crate defines the JSON messages exchanged on the control
//! connection between the remote operator and the agent, plus the
//! wire constants for side channels (bulk transfers and terminal
//! streams) and the key-code remap table used for input injection.
//!
//! Field names are normative: the remote endpoint depends on the
//! exact `request` / `requestId` / `event` spelling produced here.

pub mod error;
pub mod keymap;
pub mod message;
pub mod wire;

pub use error::ProtocolError;
pub use keymap::{NamedKey, ResolvedKey};
pub use message::{
    DirEntry, EntryKind, KeyAction, KeyEvent, Modifier, Point, Request, Response, SessionHello,
    TerminalAction, TerminalSize,
};
pub use wire::{CHANNEL_HEADER, CHUNK_SIZE, VIRTUAL_ROOT};
