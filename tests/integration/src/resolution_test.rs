//! End-to-end resolution flow
//!
//! Exercises the full pipeline: relation state -> context resolvers ->
//! registry -> rendered files on disk, including the checksum gate that
//! decides which services restart.

use std::net::IpAddr;
use std::path::PathBuf;

use calico_context::{
    AmqpContextResolver, Context, NeutronApiBase, PluginConfig, PluginContextResolver,
};
use calico_relation::{MemoryRelations, RelationStore};
use calico_render::{ConfigTarget, ContextGenerator, Registry, Result};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Generator over the plugin resolver, as the hook binary wires it
struct PluginSource {
    cfg: PluginConfig,
    private_address: IpAddr,
}

impl ContextGenerator for PluginSource {
    fn name(&self) -> &str {
        "calico-plugin"
    }

    fn generate(&self, store: &dyn RelationStore) -> Result<Context> {
        let base = NeutronApiBase::new();
        let resolver = PluginContextResolver::new(&base);
        Ok(resolver.resolve(store, &self.cfg, self.private_address)?)
    }
}

struct AmqpSource(AmqpContextResolver);

impl ContextGenerator for AmqpSource {
    fn name(&self) -> &str {
        "amqp"
    }

    fn generate(&self, store: &dyn RelationStore) -> Result<Context> {
        Ok(self.0.resolve(store)?)
    }
}

fn plugin_source() -> Box<PluginSource> {
    Box::new(PluginSource {
        cfg: PluginConfig {
            os_data_network: None,
            use_syslog: false,
            verbose: false,
            debug: true,
            disable_usage_reporting: false,
        },
        private_address: "127.0.0.15".parse().unwrap(),
    })
}

/// A deployment where the Neutron API and the broker are both ready
fn ready_store() -> MemoryRelations {
    let mut store = MemoryRelations::new();
    store.insert(
        "neutron-plugin-api",
        "neutron-plugin-api:0",
        "neutron-api/0",
        "neutron-url",
        "https://127.0.0.13:9696",
    );
    store.insert("amqp", "amqp:0", "rabbitmq/0", "hostname", "127.0.0.20");
    store.insert("amqp", "amqp:0", "rabbitmq/0", "password", "sekrit");
    store.insert("cluster", "cluster:0", "calico/1", "addr", "127.0.0.16");
    store
}

/// Registry shaped like the charm's: one shared file plus one per-daemon file
fn registry(dir: &TempDir) -> (Registry, PathBuf, PathBuf) {
    let neutron_conf = dir.path().join("neutron.conf");
    let bird_conf = dir.path().join("bird.conf");

    let mut registry = Registry::new();
    registry.register(
        ConfigTarget::new(&neutron_conf, &["calico-felix", "neutron-dhcp-agent"])
            .with_source(plugin_source())
            .with_source(Box::new(AmqpSource(AmqpContextResolver::new(
                "neutron",
                "openstack",
            )))),
    );
    registry.register(ConfigTarget::new(&bird_conf, &["bird"]).with_source(plugin_source()));
    (registry, neutron_conf, bird_conf)
}

#[test]
fn full_pass_renders_both_targets_and_restarts_their_services() {
    let dir = TempDir::new().unwrap();
    let store = ready_store();
    let (registry, neutron_conf, bird_conf) = registry(&dir);

    let changed = registry.write_all(&store).unwrap();
    assert_eq!(changed, vec![neutron_conf.clone(), bird_conf.clone()]);
    assert_eq!(
        registry.services_to_restart(&changed),
        vec!["calico-felix", "neutron-dhcp-agent", "bird"]
    );

    // The shared file carries both the plugin and the broker fields.
    let rendered: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&neutron_conf).unwrap()).unwrap();
    assert_eq!(rendered["neutron_url"], "https://127.0.0.13:9696");
    assert_eq!(rendered["neutron_plugin"], "Calico");
    assert_eq!(rendered["local_ip"], "127.0.0.15");
    assert_eq!(rendered["rabbitmq_host"], "127.0.0.20");
    assert_eq!(rendered["rabbitmq_password"], "sekrit");
    assert_eq!(rendered["peer_ips"], serde_json::json!(["127.0.0.16"]));

    // The routing daemon's file has no broker fields.
    let rendered: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&bird_conf).unwrap()).unwrap();
    assert_eq!(rendered["peer_ips"], serde_json::json!(["127.0.0.16"]));
    assert!(rendered.get("rabbitmq_host").is_none());
}

#[test]
fn unchanged_state_restarts_nothing_on_the_next_pass() {
    let dir = TempDir::new().unwrap();
    let store = ready_store();
    let (registry, _, _) = registry(&dir);

    registry.write_all(&store).unwrap();
    let changed = registry.write_all(&store).unwrap();
    assert!(changed.is_empty());
    assert!(registry.services_to_restart(&changed).is_empty());
}

#[test]
fn a_new_peer_only_touches_files_whose_content_changed() {
    let dir = TempDir::new().unwrap();
    let mut store = ready_store();
    let (registry, neutron_conf, bird_conf) = registry(&dir);
    registry.write_all(&store).unwrap();

    store.insert("cluster", "cluster:0", "calico/2", "addr", "127.0.0.17");
    let changed = registry.write_all(&store).unwrap();

    // Both files embed the peer list, so both change.
    assert_eq!(changed, vec![neutron_conf, bird_conf]);
}

#[test]
fn nothing_is_written_before_the_api_is_ready() {
    let dir = TempDir::new().unwrap();
    // Peers exist but no neutron-plugin-api and no broker.
    let mut store = MemoryRelations::new();
    store.insert("cluster", "cluster:0", "calico/1", "addr", "127.0.0.16");

    let (registry, neutron_conf, bird_conf) = registry(&dir);
    let changed = registry.write_all(&store).unwrap();

    assert!(changed.is_empty());
    assert!(!neutron_conf.exists());
    assert!(!bird_conf.exists());
    assert!(registry.complete_contexts(&store).unwrap().is_empty());
}

#[test]
fn broker_readiness_is_reported_per_source() {
    let dir = TempDir::new().unwrap();
    let mut store = MemoryRelations::new();
    store.insert("amqp", "amqp:0", "rabbitmq/0", "hostname", "127.0.0.20");
    store.insert("amqp", "amqp:0", "rabbitmq/0", "password", "sekrit");

    let (registry, _, _) = registry(&dir);
    // Broker ready, API not: only the amqp source reports complete.
    assert_eq!(registry.complete_contexts(&store).unwrap(), vec!["amqp"]);
}
