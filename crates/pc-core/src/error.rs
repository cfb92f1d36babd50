//! Core error types for PiControl

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or driving a bridge session.
///
/// The `Display` text of these errors is what clients see in `ssh_error`.
#[derive(Error, Debug)]
pub enum SessionError {
    /// TCP connect or SSH handshake failed
    #[error("Failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Remote host refused the credentials
    #[error("Authentication rejected for user '{user}'")]
    AuthenticationRejected { user: String },

    /// Dial plus authentication did not finish in time
    #[error("Connection to {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    /// Session channel could not be opened
    #[error("Failed to open session channel: {0}")]
    Channel(String),

    /// PTY allocation failed
    #[error("PTY allocation failed: {0}")]
    PtyAllocation(String),

    /// Interactive shell could not be started
    #[error("Failed to start shell: {0}")]
    ShellStart(String),

    /// Transport-level failure on an established session
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection already owns a live session
    #[error("A terminal session is already active on this connection")]
    AlreadyActive,

    /// The session has been torn down
    #[error("Session closed")]
    Closed,

    /// I/O error on the shell streams
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by subnet discovery input handling.
///
/// Probe and neighbor-table failures are absorbed by the resolver and never
/// surface as errors; only invalid requests do.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Subnet string could not be parsed as IPv4 CIDR
    #[error("Invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    /// Subnet would require an unreasonable number of probes
    #[error("Subnet /{prefix} is too large to scan (minimum prefix length is /{min})")]
    SubnetTooLarge { prefix: u8, min: u8 },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
