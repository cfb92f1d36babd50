//! Local subnet discovery
//!
//! A scan pings every host address in the subnet so the kernel populates its
//! neighbor table, then reads that table and keeps the entries that belong
//! to the subnet.

mod neighbor;
mod probe;
mod resolver;

pub use neighbor::{filter_devices, parse_neighbor_table, NeighborEntry, NeighborTable, SystemNeighborTable};
pub use probe::{PingProber, Prober};
pub use resolver::{host_addresses, parse_subnet, AddressResolver};
