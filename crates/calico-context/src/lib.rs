//! Configuration context resolvers
//!
//! A context is a flat, named key/value mapping holding everything an
//! external template renderer needs to produce one configuration file. Every
//! resolver here is a pure function of current relation state plus local
//! config, recomputed from scratch on each hook pass; an empty context is
//! the "not ready / no action needed" signal.
//!
//! Resolvers:
//!
//! - [`plugin::PluginContextResolver`]: the network-plugin/routing-daemon
//!   context (local IP, feature flags, BGP peer lists with route-reflector
//!   preference).
//! - [`etcd::EtcdProxyResolver`]: decides whether the local etcd proxy needs
//!   a restart, persisting TLS credentials only when it does.
//! - [`etcd::etcd_peer_context`]: the etcd cluster connection string.
//! - [`amqp::AmqpContextResolver`]: broker coordinates for the Neutron
//!   agents.

pub mod amqp;
pub mod checksum;
pub mod context;
pub mod error;
pub mod etcd;
pub mod plugin;

pub use amqp::AmqpContextResolver;
pub use context::{Context, ContextValue};
pub use error::{Error, Result};
pub use etcd::{EtcdProxyResolver, EtcdctlPeers, ProxyPeers, etcd_peer_context};
pub use plugin::{BaseContextProvider, NeutronApiBase, PluginConfig, PluginContextResolver};
