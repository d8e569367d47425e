//! Etcd proxy and peer contexts
//!
//! The etcd proxy cannot reload its configuration, so restarting it is
//! expensive and must only happen when meaningful state actually changed.
//! [`EtcdProxyResolver`] encodes that decision: a non-empty context is
//! produced if and only if the advertised peer set is disjoint from the
//! peers the running proxy already knows, or the TLS credentials differ
//! from what is persisted on disk.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use calico_relation::{RelationStore, first_complete};

use crate::checksum::{content_checksum, file_checksum_or_missing};
use crate::context::Context;
use crate::error::{Error, Result};

const ETCD_PROXY_RELATION: &str = "etcd-proxy";
const ETCD_PEER_RELATION: &str = "etcd-peer";

/// Fields a peer must supply before the proxy can be configured at all
const REQUIRED_FIELDS: [&str; 4] = ["cluster", "client_cert", "client_key", "client_ca"];

/// Credential file names under the resolver's credential directory
const CERT_FILE: &str = "etcd_cert";
const KEY_FILE: &str = "etcd_key";
const CA_FILE: &str = "etcd_ca";

/// Default credential directory on a deployed unit
pub const DEFAULT_CRED_DIR: &str = "/etc/neutron-calico";

/// One `name=<N> peerURLs=<U>` line of `etcdctl member list` output
static PEER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"name=([^ ]+) peerURLs=([^ ]+)").expect("peer pattern compiles"));

/// Query for the peers the locally running etcd proxy already knows about.
///
/// Best-effort by contract: the resolver folds any failure into "zero
/// existing peers", since a proxy that is not running yet is the expected
/// common case.
pub trait ProxyPeers {
    fn existing_peers(&self) -> Result<BTreeSet<String>>;
}

/// [`ProxyPeers`] that scrapes `etcdctl --no-sync member list`.
///
/// Unparseable lines are ignored; the scrape is lossy by design of the tool
/// output, not a wire protocol.
#[derive(Debug, Default)]
pub struct EtcdctlPeers;

impl EtcdctlPeers {
    pub fn new() -> Self {
        Self
    }

    fn parse_members(output: &str) -> BTreeSet<String> {
        output
            .lines()
            .filter_map(|line| {
                PEER_LINE.captures(line).map(|caps| {
                    format!("{}={}", &caps[1], &caps[2])
                })
            })
            .collect()
    }
}

impl ProxyPeers for EtcdctlPeers {
    fn existing_peers(&self) -> Result<BTreeSet<String>> {
        let output = Command::new("etcdctl")
            .args(["--no-sync", "member", "list"])
            .output()
            .map_err(|e| Error::ProxyQuery {
                message: format!("failed to run etcdctl: {e}"),
            })?;

        if !output.status.success() {
            return Err(Error::ProxyQuery {
                message: format!(
                    "etcdctl member list exited with {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(Self::parse_members(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// The restart context fields, persisted-path flavoured
#[derive(Debug, Clone, PartialEq)]
struct EtcdProxyFields {
    cluster: String,
    server_certificate: PathBuf,
    server_key: PathBuf,
    ca_certificate: PathBuf,
}

impl EtcdProxyFields {
    fn into_context(self) -> Context {
        let mut ctx = Context::new();
        ctx.insert("cluster", self.cluster);
        ctx.insert("server_certificate", self.server_certificate.display().to_string());
        ctx.insert("server_key", self.server_key.display().to_string());
        ctx.insert("ca_certificate", self.ca_certificate.display().to_string());
        ctx
    }
}

/// Decides whether the local etcd proxy needs reconfiguration/restart.
///
/// An empty context means "no action needed". A non-empty context carries
/// the new cluster string and the three credential paths, and the
/// credentials have already been persisted by the time it is returned.
pub struct EtcdProxyResolver<'a> {
    cred_dir: PathBuf,
    proxy: &'a dyn ProxyPeers,
}

impl<'a> EtcdProxyResolver<'a> {
    pub fn new(cred_dir: impl Into<PathBuf>, proxy: &'a dyn ProxyPeers) -> Self {
        Self {
            cred_dir: cred_dir.into(),
            proxy,
        }
    }

    pub fn resolve(&self, store: &dyn RelationStore) -> Result<Context> {
        let Some(creds) = first_complete(store, ETCD_PROXY_RELATION, &REQUIRED_FIELDS)? else {
            return Ok(Context::new());
        };
        let cluster = &creds["cluster"];
        let client_cert = &creds["client_cert"];
        let client_key = &creds["client_key"];
        let client_ca = &creds["client_ca"];

        let existing_peers = match self.proxy.existing_peers() {
            Ok(peers) => peers,
            Err(e) => {
                // Probably the proxy is not running yet; same as no peers.
                tracing::warn!(error = %e, "Could not query etcd proxy peers");
                BTreeSet::new()
            }
        };
        tracing::debug!(?existing_peers, "Existing etcd peers");

        let new_peers: BTreeSet<String> = cluster.split(',').map(str::to_string).collect();
        tracing::debug!(?new_peers, "New etcd peers");

        let overlap = existing_peers.intersection(&new_peers).next().is_some();
        if overlap {
            // Peer sets overlap, so the proxy is already talking to this
            // cluster. Only a credential change still forces a restart.
            let persisted = [
                file_checksum_or_missing(&self.cred_dir.join(CERT_FILE)),
                file_checksum_or_missing(&self.cred_dir.join(KEY_FILE)),
                file_checksum_or_missing(&self.cred_dir.join(CA_FILE)),
            ]
            .concat();
            let advertised = [
                content_checksum(client_cert),
                content_checksum(client_key),
                content_checksum(client_ca),
            ]
            .concat();

            if persisted == advertised {
                tracing::info!("etcd peers overlap and TLS credentials unchanged, no restart");
                return Ok(Context::new());
            }
            tracing::info!("etcd TLS credentials changed, restart needed");
        } else {
            tracing::info!("etcd peer sets are disjoint, restart needed");
        }

        let fields = EtcdProxyFields {
            cluster: cluster.clone(),
            server_certificate: self.save(client_cert, CERT_FILE)?,
            server_key: self.save(client_key, KEY_FILE)?,
            ca_certificate: self.save(client_ca, CA_FILE)?,
        };
        Ok(fields.into_context())
    }

    /// Persist one credential blob, creating the parent directory if needed.
    /// Write failure is fatal: the returned context promises this path.
    fn save(&self, data: &str, name: &str) -> Result<PathBuf> {
        let path = self.cred_dir.join(name);
        std::fs::create_dir_all(&self.cred_dir)
            .map_err(|e| Error::io(&self.cred_dir, e))?;
        std::fs::write(&path, data).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}

/// Build the etcd cluster connection string from the `etcd-peer` relation.
///
/// Records missing any of `name`/`ip`/`port` are skipped. The result is
/// always a context with a `cluster` key, possibly the empty string.
pub fn etcd_peer_context(store: &dyn RelationStore) -> Result<Context> {
    let mut members = Vec::new();

    for rid in store.relation_ids(ETCD_PEER_RELATION)? {
        for unit in store.related_units(&rid)? {
            let record = store.get_all(&rid, &unit)?;
            if let (Some(name), Some(ip), Some(port)) =
                (record.get("name"), record.get("ip"), record.get("port"))
            {
                members.push(format!("{name}=http://{ip}:{port}"));
            }
        }
    }

    let mut ctx = Context::new();
    ctx.insert("cluster", members.join(","));
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextValue;
    use calico_relation::MemoryRelations;
    use pretty_assertions::assert_eq;

    struct FixedPeers(BTreeSet<String>);

    impl ProxyPeers for FixedPeers {
        fn existing_peers(&self) -> Result<BTreeSet<String>> {
            Ok(self.0.clone())
        }
    }

    struct DownPeers;

    impl ProxyPeers for DownPeers {
        fn existing_peers(&self) -> Result<BTreeSet<String>> {
            Err(Error::ProxyQuery {
                message: "proxy not running".to_string(),
            })
        }
    }

    fn peers(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn proxy_store(cluster: &str, cert: &str, key: &str, ca: &str) -> MemoryRelations {
        let mut store = MemoryRelations::new();
        store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "cluster", cluster);
        store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_cert", cert);
        store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_key", key);
        store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "client_ca", ca);
        store
    }

    fn str_value<'c>(ctx: &'c Context, key: &str) -> &'c str {
        match ctx.get(key) {
            Some(ContextValue::Str(s)) => s,
            other => panic!("expected string for {key}, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_quadruplet_yields_empty_context() {
        let mut store = MemoryRelations::new();
        store.insert("etcd-proxy", "etcd-proxy:0", "etcd/0", "cluster", "a=u1");

        let dir = tempfile::tempdir().unwrap();
        let proxy = FixedPeers(peers(&[]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        assert!(resolver.resolve(&store).unwrap().is_empty());
    }

    #[test]
    fn disjoint_peer_sets_always_restart() {
        let store = proxy_store("b=u2", "CERT", "KEY", "CA");
        let dir = tempfile::tempdir().unwrap();

        // Even matching persisted credentials must not suppress the restart.
        std::fs::write(dir.path().join("etcd_cert"), "CERT").unwrap();
        std::fs::write(dir.path().join("etcd_key"), "KEY").unwrap();
        std::fs::write(dir.path().join("etcd_ca"), "CA").unwrap();

        let proxy = FixedPeers(peers(&["a=u1"]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        let ctx = resolver.resolve(&store).unwrap();

        assert_eq!(str_value(&ctx, "cluster"), "b=u2");
        assert_eq!(
            str_value(&ctx, "server_certificate"),
            dir.path().join("etcd_cert").display().to_string()
        );
        assert_eq!(
            str_value(&ctx, "server_key"),
            dir.path().join("etcd_key").display().to_string()
        );
        assert_eq!(
            str_value(&ctx, "ca_certificate"),
            dir.path().join("etcd_ca").display().to_string()
        );
    }

    #[test]
    fn overlapping_peers_and_same_credentials_do_nothing() {
        let store = proxy_store("a=u1", "CERT", "KEY", "CA");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etcd_cert"), "CERT").unwrap();
        std::fs::write(dir.path().join("etcd_key"), "KEY").unwrap();
        std::fs::write(dir.path().join("etcd_ca"), "CA").unwrap();

        let proxy = FixedPeers(peers(&["a=u1"]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        assert!(resolver.resolve(&store).unwrap().is_empty());
    }

    #[test]
    fn overlapping_peers_with_changed_credentials_restart_and_overwrite() {
        let store = proxy_store("a=u1,b=u2", "NEW-CERT", "NEW-KEY", "NEW-CA");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etcd_cert"), "OLD-CERT").unwrap();
        std::fs::write(dir.path().join("etcd_key"), "OLD-KEY").unwrap();
        std::fs::write(dir.path().join("etcd_ca"), "OLD-CA").unwrap();

        let proxy = FixedPeers(peers(&["a=u1"]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        let ctx = resolver.resolve(&store).unwrap();

        assert!(!ctx.is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("etcd_cert")).unwrap(),
            "NEW-CERT"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("etcd_key")).unwrap(),
            "NEW-KEY"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("etcd_ca")).unwrap(),
            "NEW-CA"
        );
    }

    #[test]
    fn missing_persisted_file_counts_as_changed() {
        // Overlapping peers but no persisted key file: the placeholder
        // component makes the hashes differ and a restart is signalled.
        let store = proxy_store("a=u1", "CERT", "KEY", "CA");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etcd_cert"), "CERT").unwrap();
        std::fs::write(dir.path().join("etcd_ca"), "CA").unwrap();

        let proxy = FixedPeers(peers(&["a=u1"]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        assert!(!resolver.resolve(&store).unwrap().is_empty());
    }

    #[test]
    fn proxy_query_failure_degrades_to_no_existing_peers() {
        let store = proxy_store("a=u1", "CERT", "KEY", "CA");
        let dir = tempfile::tempdir().unwrap();

        let resolver = EtcdProxyResolver::new(dir.path(), &DownPeers);
        let ctx = resolver.resolve(&store).unwrap();

        // No existing peers means disjoint sets, so restart.
        assert_eq!(str_value(&ctx, "cluster"), "a=u1");
        assert!(dir.path().join("etcd_cert").exists());
    }

    #[test]
    fn credentials_are_not_written_when_no_restart_needed() {
        let store = proxy_store("a=u1", "CERT", "KEY", "CA");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etcd_cert"), "CERT").unwrap();
        std::fs::write(dir.path().join("etcd_key"), "KEY").unwrap();
        std::fs::write(dir.path().join("etcd_ca"), "CA").unwrap();
        let before = std::fs::metadata(dir.path().join("etcd_cert"))
            .unwrap()
            .modified()
            .unwrap();

        let proxy = FixedPeers(peers(&["a=u1"]));
        let resolver = EtcdProxyResolver::new(dir.path(), &proxy);
        resolver.resolve(&store).unwrap();

        let after = std::fs::metadata(dir.path().join("etcd_cert"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn parse_members_scrapes_name_and_peer_urls() {
        let output = "\
7e3bd8f5bb61a3bd: name=etcd0 peerURLs=http://10.0.0.1:2380 clientURLs=http://10.0.0.1:2379
bad line without members
2a4f9c66e9dc9f11: name=etcd1 peerURLs=http://10.0.0.2:2380 clientURLs=http://10.0.0.2:2379
";
        let members = EtcdctlPeers::parse_members(output);
        assert_eq!(
            members,
            peers(&[
                "etcd0=http://10.0.0.1:2380",
                "etcd1=http://10.0.0.2:2380",
            ])
        );
    }

    #[test]
    fn peer_context_formats_cluster_string_in_order() {
        let mut store = MemoryRelations::new();
        store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "name", "n1");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "ip", "1.1.1.1");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "port", "2380");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "name", "n2");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "ip", "2.2.2.2");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "port", "2380");

        let ctx = etcd_peer_context(&store).unwrap();
        assert_eq!(
            str_value(&ctx, "cluster"),
            "n1=http://1.1.1.1:2380,n2=http://2.2.2.2:2380"
        );
    }

    #[test]
    fn peer_context_with_no_units_is_empty_string() {
        let store = MemoryRelations::new();
        let ctx = etcd_peer_context(&store).unwrap();
        assert_eq!(str_value(&ctx, "cluster"), "");
    }

    #[test]
    fn peer_context_skips_incomplete_records() {
        let mut store = MemoryRelations::new();
        store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "name", "n1");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/0", "ip", "1.1.1.1");
        // No port on etcd/0.
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "name", "n2");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "ip", "2.2.2.2");
        store.insert("etcd-peer", "etcd-peer:0", "etcd/1", "port", "2380");

        let ctx = etcd_peer_context(&store).unwrap();
        assert_eq!(str_value(&ctx, "cluster"), "n2=http://2.2.2.2:2380");
    }
}
