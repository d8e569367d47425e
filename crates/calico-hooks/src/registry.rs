//! The charm's resource map
//!
//! Which config files we manage, which services consume each one, and which
//! context sources feed it. A fresh registry is constructed per pass; the
//! config-changed hook just builds a new one from the new configuration.

use std::net::IpAddr;

use calico_context::Context;
use calico_render::{ConfigTarget, Registry, StaticContext};

use crate::config::CharmConfig;
use crate::generators::{AmqpGenerator, PluginGenerator};

pub const NEUTRON_CONF: &str = "/etc/neutron/neutron.conf";
pub const BIRD_CONF: &str = "/etc/bird/bird.conf";
pub const BIRD6_CONF: &str = "/etc/bird/bird6.conf";
pub const DHCP_CONF: &str = "/etc/neutron/dhcp_agent.ini";
pub const FELIX_CONF: &str = "/etc/calico/felix.cfg";

/// Targets owned by the etcd special case, registered only in the
/// etcd hook paths
pub const ETCD_INIT_CONF: &str = "/etc/init/etcd.conf";
pub const ETCD_DEFAULT: &str = "/etc/default/etcd";

/// Build the registry of always-managed targets
pub fn charm_registry(cfg: &CharmConfig, private_address: IpAddr) -> Registry {
    let mut registry = Registry::new();

    registry.register(
        ConfigTarget::new(
            NEUTRON_CONF,
            &["calico-felix", "neutron-dhcp-agent", "nova-api-metadata"],
        )
        .with_source(Box::new(PluginGenerator::new(
            cfg.plugin_config(),
            private_address,
        )))
        .with_source(Box::new(AmqpGenerator::new(
            &cfg.rabbit_user,
            &cfg.rabbit_vhost,
        ))),
    );

    registry.register(
        ConfigTarget::new(BIRD_CONF, &["bird"]).with_source(Box::new(PluginGenerator::new(
            cfg.plugin_config(),
            private_address,
        ))),
    );

    registry.register(
        ConfigTarget::new(DHCP_CONF, &["neutron-dhcp-agent"]).with_source(Box::new(
            PluginGenerator::new(cfg.plugin_config(), private_address),
        )),
    );

    registry.register(
        ConfigTarget::new(FELIX_CONF, &["calico-felix"]).with_source(Box::new(
            PluginGenerator::new(cfg.plugin_config(), private_address),
        )),
    );

    if cfg.enable_ipv6 {
        registry.register(
            ConfigTarget::new(BIRD6_CONF, &["bird6"]).with_source(Box::new(
                PluginGenerator::new(cfg.plugin_config(), private_address),
            )),
        );
    }

    registry
}

/// Add the etcd proxy targets, fed by an already-resolved restart context.
///
/// etcd mostly needs no active management, but when it does it needs its
/// config fully replaced and the daemon bounced, which does not mix with
/// the standard write-then-restart flow. The etcd hooks resolve the proxy
/// context exactly once (resolution persists credentials) and register its
/// result here before writing.
pub fn register_etcd_proxy_targets(registry: &mut Registry, proxy_ctx: Context) {
    registry.register(
        ConfigTarget::new(ETCD_INIT_CONF, &["etcd"])
            .with_source(Box::new(StaticContext::new("etcd-proxy", proxy_ctx.clone()))),
    );
    registry.register(
        ConfigTarget::new(ETCD_DEFAULT, &["etcd"])
            .with_source(Box::new(StaticContext::new("etcd-proxy", proxy_ctx))),
    );
}

/// Add the target fed by the etcd cluster connection string
pub fn register_etcd_peer_target(registry: &mut Registry, peer_ctx: Context) {
    registry.register(
        ConfigTarget::new(ETCD_DEFAULT, &["etcd"])
            .with_source(Box::new(StaticContext::new("etcd-peer", peer_ctx))),
    );
}
