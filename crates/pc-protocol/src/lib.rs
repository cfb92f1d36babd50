//! pc-protocol: Wire protocol for the PiControl terminal gateway
//!
//! This crate defines the JSON messages exchanged between browser clients
//! and the gateway over a WebSocket. Every message carries a `type`
//! discriminator; client messages drive the per-connection state machine
//! and server messages carry shell output or errors back.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::MessageCodec;
pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage, TerminalSize};
