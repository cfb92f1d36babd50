//! Neighbor (ARP) table reading and parsing

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use regex::Regex;
use tokio::process::Command;

use pc_core::Device;

/// Kernel ARP cache, read when neither command is available
const PROC_ARP_PATH: &str = "/proc/net/arp";

const ZERO_MAC: &str = "00:00:00:00:00:00";
const BROADCAST_MAC: &str = "ff:ff:ff:ff:ff:ff";

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("IPv4 pattern is valid")
    })
}

fn mac_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:[0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}").expect("MAC pattern is valid")
    })
}

/// Source of raw neighbor table text
#[async_trait]
pub trait NeighborTable: Send + Sync {
    /// Read the table, or `None` if no source is available
    async fn read(&self) -> Option<String>;
}

/// Reads the operating system's neighbor table.
///
/// Tries `ip neigh show`, then `arp -an`, then `/proc/net/arp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNeighborTable;

impl SystemNeighborTable {
    async fn run(program: &str, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                tracing::debug!("`{} {}` exited with {}", program, args.join(" "), output.status);
                None
            }
            Err(e) => {
                tracing::debug!("`{}` unavailable: {}", program, e);
                None
            }
        }
    }
}

#[async_trait]
impl NeighborTable for SystemNeighborTable {
    async fn read(&self) -> Option<String> {
        if let Some(table) = Self::run("ip", &["neigh", "show"]).await {
            return Some(table);
        }
        if let Some(table) = Self::run("arp", &["-an"]).await {
            return Some(table);
        }
        match tokio::fs::read_to_string(PROC_ARP_PATH).await {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!("Failed to read ARP table from any source: {}", e);
                None
            }
        }
    }
}

/// One parsed neighbor table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    /// IPv4 address
    pub ip: Ipv4Addr,
    /// Hardware address, lowercase and colon separated
    pub mac: String,
}

/// Extract (address, hardware address) pairs from neighbor table text.
///
/// Works on `ip neigh`, `arp -a` and `/proc/net/arp` formats: each row
/// contributes its first IPv4-shaped token and first MAC-shaped token.
/// Rows marked `FAILED` or `incomplete` and rows lacking either token are
/// skipped.
pub fn parse_neighbor_table(table: &str) -> Vec<NeighborEntry> {
    table
        .lines()
        .filter(|line| !line.contains("FAILED") && !line.contains("incomplete"))
        .filter_map(|line| {
            let ip = ipv4_pattern().find(line)?.as_str().parse::<Ipv4Addr>().ok()?;
            let mac = mac_pattern().find(line)?.as_str();
            Some(NeighborEntry {
                ip,
                mac: normalize_mac(mac),
            })
        })
        .collect()
}

/// Keep the entries that are real hosts of `subnet`.
///
/// Drops loopback, the all-zero and broadcast hardware addresses, addresses
/// outside the subnet, and the subnet's network and broadcast addresses.
/// Later rows repeating an address already kept are dropped.
pub fn filter_devices(entries: Vec<NeighborEntry>, subnet: Ipv4Net) -> Vec<Device> {
    let network = subnet.network();
    let broadcast = subnet.broadcast();
    let mut seen = HashSet::new();

    entries
        .into_iter()
        .filter(|entry| {
            !entry.ip.is_loopback()
                && entry.mac != ZERO_MAC
                && entry.mac != BROADCAST_MAC
                && subnet.contains(&entry.ip)
                && entry.ip != network
                && entry.ip != broadcast
        })
        .filter(|entry| seen.insert(entry.ip))
        .map(|entry| Device::new(entry.ip, entry.mac))
        .collect()
}

fn normalize_mac(mac: &str) -> String {
    mac.to_ascii_lowercase().replace('-', ":")
}
