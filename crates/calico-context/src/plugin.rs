//! Network-plugin context resolution
//!
//! Produces the context consumed by the Neutron plugin and routing-daemon
//! templates. The base fields (core driver, plugin config path, API URL)
//! come from a composed [`BaseContextProvider`]; this resolver layers the
//! Calico-specific fields on top. If the base provider is not ready, the
//! whole context is empty — never partial.

use std::net::IpAddr;

use calico_relation::{AddressFamily, RelationStore, addresses_for, security_groups_enabled};

use crate::context::Context;
use crate::error::Result;

/// BGP peers are preferred from route reflectors...
const ROUTE_REFLECTOR_RELATION: &str = "bgp-route-reflector";
/// ...falling back to full-mesh cluster peers
const CLUSTER_RELATION: &str = "cluster";

/// Relation the base provider reads the API coordinates from
const NEUTRON_PLUGIN_API_RELATION: &str = "neutron-plugin-api";

/// ML2 driver and plugin config path for a Calico-backed Neutron
const CORE_PLUGIN: &str = "neutron.plugins.ml2.plugin.Ml2Plugin";
const PLUGIN_CONFIG: &str = "/etc/neutron/plugins/ml2/ml2_conf.ini";

/// Supplies the abstract Neutron plugin fields the Calico resolver builds on.
///
/// An empty result means the provider's own preconditions are unmet and the
/// caller must short-circuit to an empty context.
pub trait BaseContextProvider {
    fn base_context(&self, store: &dyn RelationStore) -> Result<Context>;
}

/// [`BaseContextProvider`] backed by the `neutron-plugin-api` relation.
///
/// Ready once any peer advertises `neutron-url`; until then the deployment
/// has no API endpoint to point agents at and the context stays empty.
#[derive(Debug, Default)]
pub struct NeutronApiBase;

impl NeutronApiBase {
    pub fn new() -> Self {
        Self
    }
}

impl BaseContextProvider for NeutronApiBase {
    fn base_context(&self, store: &dyn RelationStore) -> Result<Context> {
        for rid in store.relation_ids(NEUTRON_PLUGIN_API_RELATION)? {
            for unit in store.related_units(&rid)? {
                if let Some(url) = store.get(&rid, &unit, "neutron-url")? {
                    let mut ctx = Context::new();
                    ctx.insert("network_manager", "neutron");
                    ctx.insert("neutron_plugin", "Calico");
                    ctx.insert("core_plugin", CORE_PLUGIN);
                    ctx.insert("config", PLUGIN_CONFIG);
                    ctx.insert("neutron_url", url);
                    return Ok(ctx);
                }
            }
        }
        tracing::debug!("neutron-plugin-api peer not ready, base context empty");
        Ok(Context::new())
    }
}

/// Local configuration consumed by the plugin context resolver
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    /// CIDR selecting the data network the unit peers over
    pub os_data_network: Option<String>,
    pub use_syslog: bool,
    pub verbose: bool,
    pub debug: bool,
    /// Inverted into the `usage_reporting` context field
    pub disable_usage_reporting: bool,
}

/// The Calico-specific fields, as a record so a missing field is a compile
/// error rather than a render-time surprise
#[derive(Debug, Clone, PartialEq)]
struct PluginFields {
    local_ip: String,
    neutron_security_groups: bool,
    use_syslog: bool,
    verbose: bool,
    debug: bool,
    usage_reporting: bool,
    peer_ips: Vec<String>,
    peer_ips6: Vec<String>,
}

impl PluginFields {
    fn into_context(self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("local_ip", self.local_ip);
        ctx.insert("neutron_security_groups", self.neutron_security_groups);
        ctx.insert("use_syslog", self.use_syslog);
        ctx.insert("verbose", self.verbose);
        ctx.insert("debug", self.debug);
        ctx.insert("usage_reporting", self.usage_reporting);
        ctx.insert("peer_ips", self.peer_ips);
        ctx.insert("peer_ips6", self.peer_ips6);
        ctx
    }
}

/// Resolver for the network-plugin/routing-daemon context
pub struct PluginContextResolver<'a> {
    base: &'a dyn BaseContextProvider,
}

impl<'a> PluginContextResolver<'a> {
    pub fn new(base: &'a dyn BaseContextProvider) -> Self {
        Self { base }
    }

    /// Resolve the full plugin context.
    ///
    /// `private_address` is the unit's own address, used as the fallback
    /// when no local address falls inside the configured data network.
    ///
    /// Returns an empty context when the base provider is not ready,
    /// regardless of relation state.
    pub fn resolve(
        &self,
        store: &dyn RelationStore,
        cfg: &PluginConfig,
        private_address: IpAddr,
    ) -> Result<Context> {
        let mut ctx = self.base.base_context(store)?;
        if ctx.is_empty() {
            return Ok(ctx);
        }

        let local_ip =
            calico_net::address_in_network(cfg.os_data_network.as_deref(), private_address)?;

        let fields = PluginFields {
            local_ip: local_ip.to_string(),
            neutron_security_groups: security_groups_enabled(store)?,
            use_syslog: cfg.use_syslog,
            verbose: cfg.verbose,
            debug: cfg.debug,
            usage_reporting: !cfg.disable_usage_reporting,
            peer_ips: bgp_peers(store, AddressFamily::V4)?,
            peer_ips6: bgp_peers(store, AddressFamily::V6)?,
        };

        ctx.merge(fields.into_context());
        Ok(ctx)
    }
}

/// Two-tier peer selection, evaluated independently per address family:
/// route-reflector addresses when any exist, cluster peers otherwise.
fn bgp_peers(store: &dyn RelationStore, family: AddressFamily) -> Result<Vec<String>> {
    let reflectors = addresses_for(store, ROUTE_REFLECTOR_RELATION, family)?;
    if !reflectors.is_empty() {
        return Ok(reflectors);
    }
    Ok(addresses_for(store, CLUSTER_RELATION, family)?)
}
