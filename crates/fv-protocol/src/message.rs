//! Control message types
//!
//! The control connection carries newline-free JSON text frames. Each
//! inbound frame is a [`Request`] discriminated by its `request`
//! field; each outbound frame is a [`Response`] discriminated by its
//! `event` field and correlated by `requestId`. Fire-and-forget
//! requests (`mouseClick`, `keypress`) carry no `requestId` and
//! receive no response.
//!
//! # Message Flow
//!
//! 1. The remote endpoint assigns a session id in the first frame
//!    after connect ([`SessionHello`])
//! 2. Filesystem commands (`ls`, `rm`, `mv`) are answered in-line
//! 3. `download` and `terminal` open dedicated side channels tagged
//!    with a correlation identifier (see [`crate::wire`])

use serde::{Deserialize, Serialize};

/// Terminal dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of columns
    pub columns: u16,
    /// Number of lines
    pub lines: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(columns: u16, lines: u16) -> Self {
        Self { columns, lines }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            columns: 80,
            lines: 24,
        }
    }
}

/// First message received on the control connection: the session id
/// assigned by the remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHello {
    /// Session identifier, stable for the process lifetime
    pub id: String,
}

/// A point in normalized screen coordinates, both axes in `[0, 1]`.
/// Scaled against the actual display resolution before injection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Key press direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    /// Key pressed
    Down,
    /// Key released
    Up,
}

/// Keyboard modifier named by the operator UI.
///
/// Unrecognized modifier names deserialize to [`Modifier::Unknown`]
/// and are ignored at injection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Control,
    Meta,
    Alt,
    #[serde(other)]
    Unknown,
}

/// A single key event from the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    /// Press or release
    pub action: KeyAction,
    /// Positional key code (e.g. `ArrowLeft`, `MetaRight`), resolved
    /// through the remap table in [`crate::keymap`]
    pub key_code: String,
    /// Literal key value, used as the fallback when `keyCode` does
    /// not resolve to a named key
    pub key: String,
    /// Modifiers held for the duration of the event
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// Terminal sub-action carried by a `terminal` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TerminalAction {
    /// Start a new terminal session, closing any existing one first
    Open { columns: u16, lines: u16 },
    /// Resize the active session in place
    Sync { columns: u16, lines: u16 },
    /// Tear the active session down
    Close,
}

/// A command received on the control connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// List directory entries at a virtual-root-relative path
    Ls { request_id: String, path: String },

    /// Move the target to the recoverable trash location
    Rm { request_id: String, path: String },

    /// Rename/move source to destination
    Mv {
        request_id: String,
        url: String,
        destination_url: String,
    },

    /// Click at a normalized point; fire-and-forget
    MouseClick {
        point: Point,
        /// Secondary (context) button instead of the primary one
        #[serde(default)]
        aux: bool,
    },

    /// Inject a key event; fire-and-forget
    Keypress { event: KeyEvent },

    /// Stream a file or directory archive over a new side channel
    Download { request_id: String, url: String },

    /// Terminal session control
    Terminal { event: TerminalAction },
}

impl Request {
    /// Decode a control text frame
    pub fn decode(text: &str) -> Result<Self, crate::ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// File-versus-folder discriminator in a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One entry of an `ls` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// `file` or `folder`
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Entry name without any path components
    pub name: String,
    /// Size in bytes; files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Creation time, RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A reply sent on the control connection, mirroring the request kind
/// in `event` and correlated by `requestId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    /// Directory listing, sorted folders-before-files then by name
    Ls {
        request_id: String,
        path: String,
        contents: Vec<DirEntry>,
    },

    /// Trash result
    Rm { request_id: String, success: bool },

    /// Move result
    Mv { request_id: String, success: bool },
}

impl Response {
    /// Encode into a control text frame
    pub fn encode(&self) -> Result<String, crate::ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
