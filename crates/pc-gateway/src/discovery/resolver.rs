//! Address resolver: probe sweep plus neighbor table correlation

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use ipnet::Ipv4Net;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use pc_core::config::{ScanSettings, MIN_SCAN_PREFIX};
use pc_core::error::DiscoveryError;
use pc_core::Device;

use super::neighbor::{filter_devices, parse_neighbor_table, NeighborTable, SystemNeighborTable};
use super::probe::{PingProber, Prober};

/// Discovers live hosts on a subnet
pub struct AddressResolver {
    /// Maximum probes in flight
    concurrency: usize,
    /// Probe implementation
    prober: Arc<dyn Prober>,
    /// Neighbor table source
    table: Arc<dyn NeighborTable>,
}

impl AddressResolver {
    /// Create a resolver that pings hosts and reads the system neighbor table
    pub fn new(settings: &ScanSettings) -> Self {
        Self::with_sources(
            settings.probe_concurrency,
            Arc::new(PingProber::new(settings.probe_timeout)),
            Arc::new(SystemNeighborTable),
        )
    }

    /// Create a resolver with custom probe and table sources
    pub fn with_sources(
        concurrency: usize,
        prober: Arc<dyn Prober>,
        table: Arc<dyn NeighborTable>,
    ) -> Self {
        Self {
            concurrency: concurrency.max(1),
            prober,
            table,
        }
    }

    /// Scan `subnet` and return the hosts found in the neighbor table.
    ///
    /// Never fails: probe failures leave hosts out of the table and an
    /// unreadable table yields an empty result.
    pub async fn scan(&self, subnet: Ipv4Net) -> Vec<Device> {
        let subnet = subnet.trunc();
        let started = Instant::now();

        let probed = self.sweep(subnet).await;
        tracing::debug!("Probed {} hosts in {} ({:?})", probed, subnet, started.elapsed());

        let Some(table) = self.table.read().await else {
            return Vec::new();
        };

        let devices = filter_devices(parse_neighbor_table(&table), subnet);
        tracing::info!(
            "Found {} devices on {} in {:?}",
            devices.len(),
            subnet,
            started.elapsed()
        );
        devices
    }

    /// Probe every host of `subnet`, waiting for all probes to finish
    async fn sweep(&self, subnet: Ipv4Net) -> usize {
        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut probes = JoinSet::new();

        for host in host_addresses(subnet) {
            let prober = Arc::clone(&self.prober);
            let limiter = Arc::clone(&limiter);
            probes.spawn(async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return;
                };
                prober.probe(host).await;
            });
        }

        let mut completed = 0;
        while let Some(result) = probes.join_next().await {
            match result {
                Ok(()) => completed += 1,
                Err(e) => tracing::debug!("Probe task failed: {}", e),
            }
        }
        completed
    }
}

/// Host addresses of `subnet`, excluding its network and broadcast addresses
pub fn host_addresses(subnet: Ipv4Net) -> impl Iterator<Item = Ipv4Addr> {
    let network = subnet.network();
    let broadcast = subnet.broadcast();
    subnet
        .hosts()
        .filter(move |addr| *addr != network && *addr != broadcast)
}

/// Parse a scan subnet from user input.
///
/// Host bits are cleared (`192.168.1.7/24` means `192.168.1.0/24`) and
/// subnets wider than `/16` are refused.
pub fn parse_subnet(input: &str) -> Result<Ipv4Net, DiscoveryError> {
    let subnet = input
        .trim()
        .parse::<Ipv4Net>()
        .map_err(|e| DiscoveryError::InvalidSubnet {
            input: input.to_string(),
            reason: e.to_string(),
        })?
        .trunc();

    if subnet.prefix_len() < MIN_SCAN_PREFIX {
        return Err(DiscoveryError::SubnetTooLarge {
            prefix: subnet.prefix_len(),
            min: MIN_SCAN_PREFIX,
        });
    }
    Ok(subnet)
}
