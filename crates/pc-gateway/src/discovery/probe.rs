//! Reachability probes

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Extra time granted to the probe process beyond its own timeout
const PROCESS_GRACE: Duration = Duration::from_secs(1);

/// Sends one reachability probe to a host.
///
/// Probes exist only for their side effect on the neighbor table, so they
/// report nothing back.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `addr`, returning once the probe finished or gave up
    async fn probe(&self, addr: Ipv4Addr);
}

/// Probes with a single `ping` echo request
pub struct PingProber {
    timeout: Duration,
}

impl PingProber {
    /// Create a prober with the given per-host timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn wait_secs(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, addr: Ipv4Addr) {
        let mut command = Command::new("ping");
        command
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.wait_secs().to_string())
            .arg(addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let limit = Duration::from_secs(self.wait_secs()) + PROCESS_GRACE;
        match tokio::time::timeout(limit, command.status()).await {
            Ok(Ok(status)) => {
                tracing::trace!("Probe {} exited with {}", addr, status);
            }
            Ok(Err(e)) => {
                tracing::trace!("Probe {} could not run: {}", addr, e);
            }
            Err(_) => {
                tracing::trace!("Probe {} killed after {:?}", addr, limit);
            }
        }
    }
}
