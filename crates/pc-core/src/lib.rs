//! pc-core: Core abstractions and configuration for PiControl
//!
//! This crate provides shared types, the remote-shell traits, error
//! taxonomy, and configuration structures used by the gateway daemon.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use pc_protocol::TerminalSize;
pub use types::{ConnectionId, Device, SessionId};
