//! Remote shell traits
//!
//! A [`ShellConnector`] turns a [`SessionRequest`] into a live, PTY-backed
//! shell on a remote host and hands back its handles split by concern:
//!
//! - `input`: exclusive write side of the shell's stdin
//! - `output`: read side of the shell's stdout/stderr
//! - `control`: window changes plus the channel and transport close steps
//!
//! The gateway's bridge session owns all three. Closing the transport must
//! make `output` reach end-of-stream so that any task blocked reading it wakes.

use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;
use pc_protocol::TerminalSize;

/// Write half of a remote shell (its stdin)
pub type ShellInput = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half of a remote shell (its stdout and stderr)
pub type ShellOutput = Box<dyn AsyncRead + Send + Unpin>;

/// Everything needed to open one remote shell
#[derive(Clone)]
pub struct SessionRequest {
    /// Target host name or address
    pub host: String,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Initial PTY size
    pub size: TerminalSize,
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("size", &self.size)
            .finish()
    }
}

/// Handles to a started remote shell
pub struct ShellHandles {
    /// Shell stdin
    pub input: ShellInput,
    /// Shell output
    pub output: ShellOutput,
    /// Resize and close operations
    pub control: Box<dyn ShellControl>,
}

/// Control operations on a started remote shell
#[async_trait]
pub trait ShellControl: Send + Sync {
    /// Forward a window-change to the remote PTY
    async fn resize(&self, size: TerminalSize) -> Result<(), SessionError>;

    /// Close the shell's session channel
    async fn close_channel(&self) -> Result<(), SessionError>;

    /// Close the underlying transport
    async fn disconnect(&self) -> Result<(), SessionError>;
}

/// Opens remote shells
#[async_trait]
pub trait ShellConnector: Send + Sync {
    /// Dial, authenticate, allocate a PTY and start an interactive shell.
    ///
    /// On failure, anything acquired along the way has already been released.
    async fn open_shell(&self, request: &SessionRequest) -> Result<ShellHandles, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_request_debug_redacts_password() {
        let request = SessionRequest {
            host: "10.0.0.5".into(),
            username: "pi".into(),
            password: "raspberry".into(),
            size: TerminalSize::default(),
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("raspberry"));
        assert!(rendered.contains("10.0.0.5"));
    }
}
