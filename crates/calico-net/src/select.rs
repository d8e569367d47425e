//! Local address selection
//!
//! Two selection paths feed the peering contract: picking the one local IPv4
//! address inside the configured data network, and picking the IPv6 address a
//! unit advertises to its cluster peers.

use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::IpNetwork;
use pnet::datalink;

use crate::{Error, Result};

/// Select the local address that falls inside `cidr`.
///
/// Enumerates local interfaces and returns the first address contained in
/// the network. When `cidr` is `None`/empty, or no local address matches,
/// the supplied `fallback` (the unit's private address) is returned so a
/// deployment without a dedicated data network still gets a usable
/// peering address.
///
/// # Errors
///
/// Returns [`Error::InvalidCidr`] when the selector does not parse.
pub fn address_in_network(cidr: Option<&str>, fallback: IpAddr) -> Result<IpAddr> {
    let Some(cidr) = cidr.filter(|c| !c.trim().is_empty()) else {
        return Ok(fallback);
    };

    let network = IpNetwork::from_str(cidr).map_err(|e| Error::InvalidCidr {
        cidr: cidr.to_string(),
        message: e.to_string(),
    })?;

    let candidates = datalink::interfaces()
        .into_iter()
        .flat_map(|iface| iface.ips.into_iter().map(|net| net.ip()));

    Ok(select_in_network(network, candidates).unwrap_or(fallback))
}

/// Pure selection core: first candidate contained in `network`.
fn select_in_network(
    network: IpNetwork,
    candidates: impl IntoIterator<Item = IpAddr>,
) -> Option<IpAddr> {
    candidates.into_iter().find(|ip| network.contains(*ip))
}

/// Find the first globally usable local IPv6 address, if any.
///
/// Link-local and loopback scopes are excluded; among the remaining
/// addresses the first in interface-enumeration order wins. The result is
/// in canonical compressed form.
pub fn local_ipv6_address() -> Option<String> {
    let addrs = datalink::interfaces().into_iter().flat_map(|iface| {
        iface
            .ips
            .into_iter()
            .filter(|net| net.is_ipv6())
            .map(|net| net.ip().to_string())
    });
    first_global_ipv6(addrs)
}

/// Selection core for [`local_ipv6_address`], operating on textual
/// addresses as reported by the OS (zone suffixes such as `%eth0` are
/// stripped before parsing).
///
/// Returns `None` when no address qualifies; unparseable entries are
/// skipped.
pub fn first_global_ipv6<I>(addrs: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    for raw in addrs {
        let bare = raw.split('%').next().unwrap_or(&raw);
        let Ok(addr) = bare.parse::<Ipv6Addr>() else {
            tracing::debug!(addr = %raw, "Skipping unparseable IPv6 address");
            continue;
        };
        if addr.is_loopback() || addr.is_unspecified() || is_link_local(&addr) {
            continue;
        }
        return Some(addr.to_string());
    }
    None
}

/// fe80::/10, the unicast link-local block
fn is_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}
