//! Hostname to address resolution

use std::net::{IpAddr, ToSocketAddrs};

use crate::{Error, Result};

/// Resolve a hostname or address literal to an `IpAddr`.
///
/// Uses the system resolver (`getaddrinfo` semantics, so `/etc/hosts` and
/// `nsswitch` apply) and takes the first returned address, matching what a
/// BGP daemon config expects. Literals pass through unchanged.
///
/// # Errors
///
/// Returns [`Error::Resolution`] when lookup fails and
/// [`Error::NoAddresses`] when lookup succeeds but yields nothing.
pub fn resolve_host(host: &str) -> Result<IpAddr> {
    // Port 0 is a placeholder; only the address part is used.
    let mut addrs = (host, 0u16).to_socket_addrs().map_err(|e| Error::Resolution {
        host: host.to_string(),
        source: e,
    })?;

    addrs
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| Error::NoAddresses {
            host: host.to_string(),
        })
}
