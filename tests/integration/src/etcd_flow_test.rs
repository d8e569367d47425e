//! The etcd restart decision, end to end
//!
//! Covers the flow the etcd hooks run: resolve the proxy context once
//! (persisting credentials when a restart is warranted), hand the result to
//! the registry through a static source, and render the etcd config files.

use std::collections::BTreeSet;

use calico_context::{Context, ContextValue, EtcdProxyResolver, ProxyPeers, etcd_peer_context};
use calico_relation::MemoryRelations;
use calico_render::{ConfigTarget, Registry, StaticContext, WriteOutcome};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct FixedPeers(BTreeSet<String>);

impl ProxyPeers for FixedPeers {
    fn existing_peers(&self) -> calico_context::Result<BTreeSet<String>> {
        Ok(self.0.clone())
    }
}

fn advertising_store(cluster: &str) -> MemoryRelations {
    let mut store = MemoryRelations::new();
    store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "cluster", cluster);
    store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_cert", "CERT");
    store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_key", "KEY");
    store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_ca", "CA");
    store
}

#[test]
fn fresh_unit_persists_credentials_and_renders_etcd_config() {
    let dir = TempDir::new().unwrap();
    let cred_dir = dir.path().join("creds");
    let etcd_conf = dir.path().join("etcd.conf");

    let store = advertising_store("n1=http://1.1.1.1:2380");
    let proxy = FixedPeers(BTreeSet::new());
    let resolver = EtcdProxyResolver::new(&cred_dir, &proxy);

    let ctx = resolver.resolve(&store).unwrap();
    assert!(!ctx.is_empty());
    assert_eq!(std::fs::read_to_string(cred_dir.join("etcd_cert")).unwrap(), "CERT");
    assert_eq!(std::fs::read_to_string(cred_dir.join("etcd_key")).unwrap(), "KEY");
    assert_eq!(std::fs::read_to_string(cred_dir.join("etcd_ca")).unwrap(), "CA");

    // Resolve once, then feed the result to the registry statically.
    let mut registry = Registry::new();
    registry.register(
        ConfigTarget::new(&etcd_conf, &["etcd"])
            .with_source(Box::new(StaticContext::new("etcd-proxy", ctx))),
    );
    assert_eq!(
        registry.write(&etcd_conf, &store).unwrap(),
        WriteOutcome::Changed
    );

    let rendered: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&etcd_conf).unwrap()).unwrap();
    assert_eq!(rendered["cluster"], "n1=http://1.1.1.1:2380");
    assert_eq!(
        rendered["server_certificate"],
        cred_dir.join("etcd_cert").display().to_string()
    );
}

#[test]
fn settled_unit_resolves_empty_and_leaves_credentials_alone() {
    let dir = TempDir::new().unwrap();
    let cred_dir = dir.path().join("creds");
    std::fs::create_dir_all(&cred_dir).unwrap();
    std::fs::write(cred_dir.join("etcd_cert"), "CERT").unwrap();
    std::fs::write(cred_dir.join("etcd_key"), "KEY").unwrap();
    std::fs::write(cred_dir.join("etcd_ca"), "CA").unwrap();

    // The proxy already knows the advertised peer and credentials match.
    let store = advertising_store("n1=http://1.1.1.1:2380");
    let proxy = FixedPeers(
        ["n1=http://1.1.1.1:2380".to_string()].into_iter().collect(),
    );
    let resolver = EtcdProxyResolver::new(&cred_dir, &proxy);

    assert!(resolver.resolve(&store).unwrap().is_empty());
}

#[test]
fn cluster_move_triggers_a_second_restart_cycle() {
    let dir = TempDir::new().unwrap();
    let cred_dir = dir.path().join("creds");

    // First pass: fresh unit joins cluster A.
    let store = advertising_store("a=http://1.1.1.1:2380");
    let proxy = FixedPeers(BTreeSet::new());
    let resolver = EtcdProxyResolver::new(&cred_dir, &proxy);
    assert!(!resolver.resolve(&store).unwrap().is_empty());

    // Second pass: the relation now advertises a disjoint cluster B, while
    // the running proxy still reports cluster A.
    let store = advertising_store("b=http://2.2.2.2:2380");
    let proxy = FixedPeers(
        ["a=http://1.1.1.1:2380".to_string()].into_iter().collect(),
    );
    let resolver = EtcdProxyResolver::new(&cred_dir, &proxy);
    let ctx = resolver.resolve(&store).unwrap();

    assert_eq!(
        ctx.get("cluster"),
        Some(&ContextValue::from("b=http://2.2.2.2:2380"))
    );
}

#[test]
fn peer_context_flows_into_the_default_file() {
    let dir = TempDir::new().unwrap();
    let etcd_default = dir.path().join("default-etcd");

    let mut store = MemoryRelations::new();
    store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "name", "n1");
    store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "ip", "1.1.1.1");
    store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "port", "2380");

    let peer_ctx = etcd_peer_context(&store).unwrap();
    let mut registry = Registry::new();
    registry.register(
        ConfigTarget::new(&etcd_default, &["etcd"])
            .with_source(Box::new(StaticContext::new("etcd-peer", peer_ctx))),
    );
    registry.write(&etcd_default, &store).unwrap();

    let rendered: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&etcd_default).unwrap()).unwrap();
    assert_eq!(rendered["cluster"], "n1=http://1.1.1.1:2380");
}
