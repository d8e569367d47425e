//! Hook names dispatched by the orchestration framework

use std::fmt;

/// Hooks this charm responds to.
///
/// Unknown hook names are skipped, not errors: the framework invokes every
/// hook it knows about and only some concern us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Install,
    ConfigChanged,
    NeutronPluginJoined,
    NeutronPluginChanged,
    NeutronPluginApiChanged,
    ClusterJoined,
    ClusterChanged,
    ClusterDeparted,
    BgpRouteReflectorJoined,
    BgpRouteReflectorChanged,
    BgpRouteReflectorDeparted,
    AmqpJoined,
    AmqpChanged,
    AmqpDeparted,
    EtcdProxyJoined,
    EtcdProxyChanged,
    EtcdPeerJoined,
    EtcdPeerChanged,
}

impl HookKind {
    /// Parse a hook name as passed on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "install" => Some(Self::Install),
            "config-changed" => Some(Self::ConfigChanged),
            "neutron-plugin-relation-joined" => Some(Self::NeutronPluginJoined),
            "neutron-plugin-relation-changed" => Some(Self::NeutronPluginChanged),
            "neutron-plugin-api-relation-changed" => Some(Self::NeutronPluginApiChanged),
            "cluster-relation-joined" => Some(Self::ClusterJoined),
            "cluster-relation-changed" => Some(Self::ClusterChanged),
            "cluster-relation-departed" => Some(Self::ClusterDeparted),
            "bgp-route-reflector-relation-joined" => Some(Self::BgpRouteReflectorJoined),
            "bgp-route-reflector-relation-changed" => Some(Self::BgpRouteReflectorChanged),
            "bgp-route-reflector-relation-departed" => Some(Self::BgpRouteReflectorDeparted),
            "amqp-relation-joined" => Some(Self::AmqpJoined),
            "amqp-relation-changed" => Some(Self::AmqpChanged),
            "amqp-relation-departed" => Some(Self::AmqpDeparted),
            "etcd-proxy-relation-joined" => Some(Self::EtcdProxyJoined),
            "etcd-proxy-relation-changed" => Some(Self::EtcdProxyChanged),
            "etcd-peer-relation-joined" => Some(Self::EtcdPeerJoined),
            "etcd-peer-relation-changed" => Some(Self::EtcdPeerChanged),
            _ => None,
        }
    }

    /// List all hook names this charm handles
    pub fn all_names() -> &'static [&'static str] {
        &[
            "install",
            "config-changed",
            "neutron-plugin-relation-joined",
            "neutron-plugin-relation-changed",
            "neutron-plugin-api-relation-changed",
            "cluster-relation-joined",
            "cluster-relation-changed",
            "cluster-relation-departed",
            "bgp-route-reflector-relation-joined",
            "bgp-route-reflector-relation-changed",
            "bgp-route-reflector-relation-departed",
            "amqp-relation-joined",
            "amqp-relation-changed",
            "amqp-relation-departed",
            "etcd-proxy-relation-joined",
            "etcd-proxy-relation-changed",
            "etcd-peer-relation-joined",
            "etcd-peer-relation-changed",
        ]
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::ConfigChanged => "config-changed",
            Self::NeutronPluginJoined => "neutron-plugin-relation-joined",
            Self::NeutronPluginChanged => "neutron-plugin-relation-changed",
            Self::NeutronPluginApiChanged => "neutron-plugin-api-relation-changed",
            Self::ClusterJoined => "cluster-relation-joined",
            Self::ClusterChanged => "cluster-relation-changed",
            Self::ClusterDeparted => "cluster-relation-departed",
            Self::BgpRouteReflectorJoined => "bgp-route-reflector-relation-joined",
            Self::BgpRouteReflectorChanged => "bgp-route-reflector-relation-changed",
            Self::BgpRouteReflectorDeparted => "bgp-route-reflector-relation-departed",
            Self::AmqpJoined => "amqp-relation-joined",
            Self::AmqpChanged => "amqp-relation-changed",
            Self::AmqpDeparted => "amqp-relation-departed",
            Self::EtcdProxyJoined => "etcd-proxy-relation-joined",
            Self::EtcdProxyChanged => "etcd-proxy-relation-changed",
            Self::EtcdPeerJoined => "etcd-peer-relation-joined",
            Self::EtcdPeerChanged => "etcd-peer-relation-changed",
        };
        f.write_str(name)
    }
}
