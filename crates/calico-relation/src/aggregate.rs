//! Relation aggregation rules
//!
//! Converts raw, unordered, possibly-incomplete peer data into typed values.
//! Peers that have not yet set an attribute are "not ready", never an error;
//! a peer that advertises an unresolvable hostname is a loud failure.

use std::collections::BTreeMap;

use calico_net::resolve_host;

use crate::error::Result;
use crate::store::RelationStore;

/// Relation the security-groups flag arrives on
const NEUTRON_PLUGIN_API_RELATION: &str = "neutron-plugin-api";

/// Address family selector for peer address aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// The relation attribute carrying addresses of this family
    pub fn attribute(self) -> &'static str {
        match self {
            Self::V4 => "addr",
            Self::V6 => "addr6",
        }
    }
}

/// Collect the ordered list of peer-advertised addresses on a relation.
///
/// Enumeration is relation-id-major, unit-minor; duplicates are kept. Units
/// that have not set the attribute are skipped. Family-4 values are treated
/// as hostnames and resolved to a literal (first result); family-6 values
/// pass through verbatim.
///
/// # Errors
///
/// Propagates hostname resolution failure: a misconfigured peer must not
/// silently vanish from the BGP peer list.
pub fn addresses_for(
    store: &dyn RelationStore,
    relation: &str,
    family: AddressFamily,
) -> Result<Vec<String>> {
    let attribute = family.attribute();
    let mut addrs = Vec::new();

    for rid in store.relation_ids(relation)? {
        for unit in store.related_units(&rid)? {
            let Some(value) = store.get(&rid, &unit, attribute)? else {
                continue;
            };
            match family {
                AddressFamily::V4 => addrs.push(resolve_host(&value)?.to_string()),
                AddressFamily::V6 => addrs.push(value),
            }
        }
    }

    Ok(addrs)
}

/// Whether the Neutron API has instructed us to enforce security groups.
///
/// First peer to express an opinion wins; later peers are not consulted.
/// Defaults to `false` when no peer has set the flag.
pub fn security_groups_enabled(store: &dyn RelationStore) -> Result<bool> {
    for rid in store.relation_ids(NEUTRON_PLUGIN_API_RELATION)? {
        for unit in store.related_units(&rid)? {
            if let Some(value) = store.get(&rid, &unit, "neutron-security-groups")? {
                return Ok(parse_flag(&value));
            }
        }
    }
    Ok(false)
}

/// Parse a boolean-ish relation/config flag (`true`/`yes`/`y`/`on`/`1`)
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "on" | "1"
    )
}

/// Scan a relation for the given fields with first-non-null-wins precedence.
///
/// Fields are captured independently as peers are enumerated; once a field
/// is captured, a later peer's value for it is never substituted. Returns
/// the full map once every requested field has been captured, `None` when
/// the scan completes with gaps. Empty-string values count as unset.
pub fn first_complete(
    store: &dyn RelationStore,
    relation: &str,
    fields: &[&str],
) -> Result<Option<BTreeMap<String, String>>> {
    let mut captured: BTreeMap<String, String> = BTreeMap::new();

    for rid in store.relation_ids(relation)? {
        for unit in store.related_units(&rid)? {
            let record = store.get_all(&rid, &unit)?;
            for &field in fields {
                if captured.contains_key(field) {
                    continue;
                }
                if let Some(value) = record.get(field).filter(|v| !v.is_empty()) {
                    captured.insert(field.to_string(), value.clone());
                }
            }
            if captured.len() == fields.len() {
                return Ok(Some(captured));
            }
        }
    }

    Ok(None)
}
