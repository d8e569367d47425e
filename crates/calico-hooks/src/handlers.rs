//! Hook bodies
//!
//! Each handler is one run-to-completion resolution pass: load config,
//! build a fresh registry, resolve contexts, write what changed, restart
//! only the services whose files changed. Handlers take the relation store
//! and service control as parameters so the pass logic is testable without
//! a live hook environment.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use calico_context::{
    ContextValue, EtcdProxyResolver, EtcdctlPeers, etcd::DEFAULT_CRED_DIR, etcd_peer_context,
};
use calico_relation::{HookEnv, RelationStore};
use calico_render::Registry;

use crate::actions::{self, ETCD_DATA_DIR, ServiceControl, SystemctlControl};
use crate::config::CharmConfig;
use crate::error::Result;
use crate::hook::HookKind;
use crate::registry::{
    ETCD_DEFAULT, ETCD_INIT_CONF, FELIX_CONF, charm_registry, register_etcd_peer_target,
    register_etcd_proxy_targets,
};

/// Execute one hook against the live environment
pub fn execute(kind: HookKind) -> Result<()> {
    let env = HookEnv::new();
    let services = SystemctlControl;
    tracing::info!(hook = %kind, "Executing hook");

    match kind {
        HookKind::Install => install(&env),
        HookKind::ConfigChanged
        | HookKind::NeutronPluginChanged
        | HookKind::NeutronPluginApiChanged
        | HookKind::ClusterChanged
        | HookKind::ClusterDeparted
        | HookKind::BgpRouteReflectorChanged
        | HookKind::BgpRouteReflectorDeparted => {
            let (cfg, private) = pass_inputs(&env)?;
            write_and_restart(&charm_registry(&cfg, private), &env, &services)
        }
        HookKind::AmqpChanged | HookKind::AmqpDeparted => {
            let (cfg, private) = pass_inputs(&env)?;
            amqp_changed(&charm_registry(&cfg, private), &env, &services)
        }
        HookKind::NeutronPluginJoined => neutron_plugin_joined(&env),
        HookKind::ClusterJoined | HookKind::BgpRouteReflectorJoined => advertise_addresses(&env),
        HookKind::AmqpJoined => {
            let cfg = CharmConfig::load(&env)?;
            amqp_joined(&env, &cfg)
        }
        HookKind::EtcdProxyJoined | HookKind::EtcdProxyChanged => {
            let (cfg, private) = pass_inputs(&env)?;
            let proxy = EtcdctlPeers::new();
            let resolver = EtcdProxyResolver::new(DEFAULT_CRED_DIR, &proxy);
            let proxy_ctx = resolver.resolve(&env)?;
            etcd_proxy_hook(
                charm_registry(&cfg, private),
                proxy_ctx,
                &env,
                &services,
                Path::new(ETCD_DATA_DIR),
            )
        }
        HookKind::EtcdPeerJoined | HookKind::EtcdPeerChanged => {
            let (cfg, private) = pass_inputs(&env)?;
            etcd_peer_hook(
                charm_registry(&cfg, private),
                &env,
                &services,
                Path::new(ETCD_DATA_DIR),
            )
        }
    }
}

/// Config and resolved private address, loaded fresh for this pass
fn pass_inputs(env: &HookEnv) -> Result<(CharmConfig, IpAddr)> {
    let cfg = CharmConfig::load(env)?;
    let private = calico_net::resolve_host(&env.unit_get("private-address")?)?;
    Ok((cfg, private))
}

/// The standard pass: render everything, restart owners of changed files
fn write_and_restart(
    registry: &Registry,
    store: &dyn RelationStore,
    services: &dyn ServiceControl,
) -> Result<()> {
    let changed = registry.write_all(store)?;
    for service in registry.services_to_restart(&changed) {
        tracing::info!(service, "Restarting service for changed config");
        services.restart(&service)?;
    }
    Ok(())
}

/// amqp-relation-changed: only render once the broker is actually ready
fn amqp_changed(
    registry: &Registry,
    store: &dyn RelationStore,
    services: &dyn ServiceControl,
) -> Result<()> {
    let complete = registry.complete_contexts(store)?;
    if !complete.iter().any(|name| name == "amqp") {
        tracing::info!("amqp relation incomplete, peer not ready?");
        return Ok(());
    }
    write_and_restart(registry, store, services)
}

/// install: package sources, packages, felix bootstrap, agent pause
fn install(env: &HookEnv) -> Result<()> {
    let cfg = CharmConfig::load(env)?;
    actions::add_package_sources(&cfg)?;
    actions::maybe_create_felix_cfg(Path::new(FELIX_CONF))?;
    actions::install_packages()?;
    if let Some(url) = &cfg.etcd_package_url {
        actions::install_etcd_package(url)?;
    }
    actions::pause_conflicting_agents(&SystemctlControl)
}

/// Advertise our peering addresses on the relation that just joined
fn advertise_addresses(env: &HookEnv) -> Result<()> {
    let mut values = BTreeMap::new();
    values.insert("addr".to_string(), env.unit_get("private-address")?);
    if let Some(addr6) = calico_net::local_ipv6_address() {
        values.insert("addr6".to_string(), addr6);
    }
    env.set(None, &values)?;
    Ok(())
}

/// Tell the principal charm to enable the metadata service
fn neutron_plugin_joined(env: &HookEnv) -> Result<()> {
    let mut values = BTreeMap::new();
    values.insert("enable-metadata".to_string(), "True".to_string());
    env.set(None, &values)?;
    Ok(())
}

/// Ask the broker for our user and vhost
fn amqp_joined(env: &HookEnv, cfg: &CharmConfig) -> Result<()> {
    let mut values = BTreeMap::new();
    values.insert("username".to_string(), cfg.rabbit_user.clone());
    values.insert("vhost".to_string(), cfg.rabbit_vhost.clone());
    env.set(None, &values)?;
    Ok(())
}

/// etcd-proxy hook: if the already-resolved proxy context signals a restart,
/// write the etcd targets and bounce the daemon with its state wiped.
fn etcd_proxy_hook(
    mut registry: Registry,
    proxy_ctx: calico_context::Context,
    store: &dyn RelationStore,
    services: &dyn ServiceControl,
    data_dir: &Path,
) -> Result<()> {
    if proxy_ctx.is_empty() {
        tracing::debug!("etcd proxy context empty, nothing to do");
        return Ok(());
    }

    tracing::info!("Force etcd restart");
    register_etcd_proxy_targets(&mut registry, proxy_ctx);
    registry.write(Path::new(ETCD_INIT_CONF), store)?;
    registry.write(Path::new(ETCD_DEFAULT), store)?;
    actions::force_etcd_restart(services, data_dir)
}

/// etcd-peer hook: render the cluster connection string and bounce etcd
/// once at least one peer is advertising.
fn etcd_peer_hook(
    mut registry: Registry,
    store: &dyn RelationStore,
    services: &dyn ServiceControl,
    data_dir: &Path,
) -> Result<()> {
    let peer_ctx = etcd_peer_context(store)?;
    let ready = matches!(peer_ctx.get("cluster"), Some(ContextValue::Str(s)) if !s.is_empty());
    if !ready {
        tracing::debug!("No etcd peers advertising yet");
        return Ok(());
    }

    tracing::info!("Force etcd restart");
    register_etcd_peer_target(&mut registry, peer_ctx);
    registry.write(Path::new(ETCD_DEFAULT), store)?;
    actions::force_etcd_restart(services, data_dir)
}
