//! Address resolution and local address selection
//!
//! Layer 0 networking support for the Calico charm:
//!
//! - **Hostname resolution**: peers advertise their IPv4 endpoint as a
//!   hostname or literal; we map it to an address before handing it to BGP.
//! - **Data-network selection**: pick the one local address that falls inside
//!   the operator-configured data network CIDR.
//! - **IPv6 advertisement**: find the first globally usable IPv6 address on
//!   any local interface.

pub mod error;
pub mod resolve;
pub mod select;

pub use error::{Error, Result};
pub use resolve::resolve_host;
pub use select::{address_in_network, first_global_ipv6, local_ipv6_address};
