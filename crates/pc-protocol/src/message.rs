//! Message types for the gateway WebSocket protocol
//!
//! All frames are JSON text objects tagged by a `type` field.
//!
//! # Message Flow
//!
//! 1. Client opens `/ws` and sends `start_session` with target host and credentials
//! 2. Gateway dials the host over SSH, allocates a PTY and starts a shell
//! 3. Shell output flows back as `ssh_data` chunks
//! 4. Keystrokes flow forward as `input`, window changes as `resize`
//! 5. Failures to start a session (or I/O failures) are reported as `ssh_error`
//!
//! Integer fields are accepted as signed JSON numbers so that zero or
//! negative values from clients can be recognised and ignored rather than
//! rejected as malformed. Objects with an unrecognized `type` are not
//! errors; [`MessageCodec::decode_client`](crate::MessageCodec::decode_client)
//! skips them.

use serde::{Deserialize, Serialize};

/// Terminal dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Default terminal size (24x80)
    pub fn default_size() -> Self {
        Self { rows: 24, cols: 80 }
    }

    /// Build a size from client-supplied dimensions.
    ///
    /// Returns `None` unless both dimensions are positive. Values beyond
    /// `u16::MAX` saturate.
    pub fn from_dimensions(cols: i64, rows: i64) -> Option<Self> {
        if cols <= 0 || rows <= 0 {
            return None;
        }
        Some(Self {
            rows: u16::try_from(rows).unwrap_or(u16::MAX),
            cols: u16::try_from(cols).unwrap_or(u16::MAX),
        })
    }

    /// Like [`TerminalSize::from_dimensions`], substituting `fallback` for
    /// each missing or non-positive dimension independently.
    pub fn or_fallback(cols: Option<i64>, rows: Option<i64>, fallback: TerminalSize) -> Self {
        let pick = |value: Option<i64>, default: u16| match value {
            Some(v) if v > 0 => u16::try_from(v).unwrap_or(u16::MAX),
            _ => default,
        };
        Self {
            rows: pick(rows, fallback.rows),
            cols: pick(cols, fallback.cols),
        }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::default_size()
    }
}

impl std::fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Messages sent by the browser client
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a remote shell on `hostname`.
    ///
    /// `start_ssh` is accepted as an alias for older clients.
    #[serde(alias = "start_ssh")]
    StartSession {
        hostname: String,
        username: String,
        #[serde(default)]
        password: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cols: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<i64>,
    },

    /// Raw keystrokes for the remote shell
    Input {
        #[serde(default)]
        data: String,
    },

    /// Terminal window changed size
    Resize {
        #[serde(default)]
        cols: i64,
        #[serde(default)]
        rows: i64,
    },
}

impl ClientMessage {
    /// Every `type` the gateway acts on, aliases included
    pub const KINDS: &'static [&'static str] = &["start_session", "start_ssh", "input", "resize"];

    /// Wire name of this message's `type`
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::StartSession { .. } => "start_session",
            ClientMessage::Input { .. } => "input",
            ClientMessage::Resize { .. } => "resize",
        }
    }
}

// Passwords must never reach the logs.
impl std::fmt::Debug for ClientMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientMessage::StartSession {
                hostname,
                username,
                cols,
                rows,
                ..
            } => f
                .debug_struct("StartSession")
                .field("hostname", hostname)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("cols", cols)
                .field("rows", rows)
                .finish(),
            ClientMessage::Input { data } => {
                f.debug_struct("Input").field("len", &data.len()).finish()
            }
            ClientMessage::Resize { cols, rows } => f
                .debug_struct("Resize")
                .field("cols", cols)
                .field("rows", rows)
                .finish(),
        }
    }
}

/// Messages sent by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session start or I/O failure
    SshError { data: String },
    /// A chunk of remote shell output
    SshData { data: String },
}

impl ServerMessage {
    /// Build an error message from anything displayable
    pub fn error(message: impl std::fmt::Display) -> Self {
        ServerMessage::SshError {
            data: message.to_string(),
        }
    }

    /// Build a data message
    pub fn data(chunk: impl Into<String>) -> Self {
        ServerMessage::SshData { data: chunk.into() }
    }
}
