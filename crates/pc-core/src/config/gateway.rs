//! Gateway configuration

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use pc_protocol::TerminalSize;

/// Smallest accepted prefix length for a scan subnet.
///
/// A /16 already means 65k probes; anything wider is refused.
pub const MIN_SCAN_PREFIX: u8 = 16;

/// Configuration for the gateway daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address to bind the HTTP/WebSocket server to
    pub bind_address: String,

    /// Size of each read from a remote shell's output stream
    pub relay_chunk_size: usize,

    /// Capacity of each connection's outbound message queue
    pub outbound_queue: usize,

    /// Subnet discovery settings
    pub scan: ScanSettings,

    /// Outbound SSH settings
    pub ssh: SshSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            relay_chunk_size: 1024,
            outbound_queue: 256,
            scan: ScanSettings::default(),
            ssh: SshSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.ssh.validate()?;

        if self.relay_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "relay_chunk_size must be greater than zero".into(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Invalid(
                "outbound_queue must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Subnet discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Subnet swept by `/scan` when the request names none
    pub subnet: Ipv4Net,

    /// Per-host reachability probe timeout
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,

    /// Maximum probes in flight at once
    pub probe_concurrency: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            subnet: Ipv4Net::new(Ipv4Addr::new(192, 168, 1, 0), 24)
                .expect("24 is a valid IPv4 prefix length"),
            probe_timeout: Duration::from_secs(1),
            probe_concurrency: 64,
        }
    }
}

impl ScanSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.subnet.prefix_len() < MIN_SCAN_PREFIX {
            return Err(ConfigError::Invalid(format!(
                "scan.subnet {} is wider than /{}",
                self.subnet, MIN_SCAN_PREFIX
            )));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "scan.probe_timeout must be at least one second".into(),
            ));
        }
        if self.probe_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "scan.probe_concurrency must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Outbound SSH settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    /// Remote shell port
    pub port: u16,

    /// Bound on dial plus authentication
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Terminal type requested with the PTY
    pub term: String,

    /// Columns used when a client does not send any
    pub default_cols: u16,

    /// Rows used when a client does not send any
    pub default_rows: u16,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(10),
            term: "xterm".to_string(),
            default_cols: 80,
            default_rows: 24,
        }
    }
}

impl SshSettings {
    /// Terminal size used when a client omits dimensions
    pub fn default_size(&self) -> TerminalSize {
        TerminalSize::new(self.default_rows, self.default_cols)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("ssh.port must be non-zero".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "ssh.connect_timeout must be at least one second".into(),
            ));
        }
        if self.term.trim().is_empty() {
            return Err(ConfigError::Invalid("ssh.term must not be empty".into()));
        }
        if self.default_cols == 0 || self.default_rows == 0 {
            return Err(ConfigError::Invalid(
                "ssh.default_cols and ssh.default_rows must be positive".into(),
            ));
        }
        Ok(())
    }
}
