//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Identity of one open client WebSocket.
///
/// Allocated when the channel opens and owned by that channel's task; it is
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Unique identifier for a bridge session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A host seen on the local network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// IPv4 address
    pub ip: String,
    /// Hardware (MAC) address, lowercase and colon separated
    pub mac: String,
}

impl Device {
    /// Create a new device entry
    pub fn new(ip: Ipv4Addr, mac: impl Into<String>) -> Self {
        Self {
            ip: ip.to_string(),
            mac: mac.into(),
        }
    }
}
