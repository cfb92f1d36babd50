//! pc-gateway: LAN terminal gateway
//!
//! The gateway discovers hosts on the local subnet and bridges browser
//! WebSocket connections to interactive SSH shells. Each WebSocket owns at
//! most one bridge session; the connection registry maps open connections
//! to their live sessions.

pub mod discovery;
pub mod registry;
pub mod server;
pub mod session;
pub mod ssh;
pub mod state;

pub use registry::{ConnectionRegistry, IdAllocator};
pub use state::GatewayState;
