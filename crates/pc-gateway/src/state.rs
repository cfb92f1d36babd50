//! Shared gateway state

use std::sync::Arc;

use pc_core::config::GatewayConfig;
use pc_core::traits::ShellConnector;
use pc_core::TerminalSize;
use pc_protocol::MessageCodec;

use crate::discovery::AddressResolver;
use crate::registry::{ConnectionRegistry, IdAllocator};
use crate::session::BridgeSession;
use crate::ssh::SshConnector;

/// State shared by every request and connection task
pub struct GatewayState {
    /// Configuration
    pub config: GatewayConfig,
    /// Live sessions by client connection
    pub registry: Arc<ConnectionRegistry<BridgeSession>>,
    /// Connection and session ID source
    pub ids: IdAllocator,
    /// Opens remote shells
    pub connector: Arc<dyn ShellConnector>,
    /// Subnet discovery
    pub resolver: AddressResolver,
    /// WebSocket message codec
    pub codec: MessageCodec,
}

impl GatewayState {
    /// Create state that opens shells over SSH and scans with `ping`
    pub fn new(config: GatewayConfig) -> Self {
        let connector = Arc::new(SshConnector::new(&config.ssh));
        Self::with_connector(config, connector)
    }

    /// Create state with a custom shell connector
    pub fn with_connector(config: GatewayConfig, connector: Arc<dyn ShellConnector>) -> Self {
        let resolver = AddressResolver::new(&config.scan);
        Self::with_parts(config, connector, resolver)
    }

    /// Create state from explicit parts
    pub fn with_parts(
        config: GatewayConfig,
        connector: Arc<dyn ShellConnector>,
        resolver: AddressResolver,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            ids: IdAllocator::new(),
            connector,
            resolver,
            codec: MessageCodec::new(),
        }
    }

    /// PTY size used when a client sends no usable dimensions
    pub fn default_terminal_size(&self) -> TerminalSize {
        self.config.ssh.default_size()
    }

    /// Tear down every live session.
    ///
    /// Returns how many sessions were torn down.
    pub async fn shutdown_sessions(&self) -> usize {
        let sessions = self.registry.drain();
        let count = sessions.len();
        for session in sessions {
            session.teardown().await;
        }
        count
    }
}
