//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding or encoding gateway messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Message was not valid JSON or did not match any known message shape
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Frame kind the protocol does not carry (e.g. binary frames)
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(&'static str),

    /// Message exceeds the accepted size
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },
}
