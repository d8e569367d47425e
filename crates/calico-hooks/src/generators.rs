//! Adapters binding the context resolvers to the render registry
//!
//! Each generator captures the per-pass inputs a resolver needs (config
//! flags, the unit's private address) so the registry can drive every
//! source through one interface.

use std::net::IpAddr;

use calico_context::{
    AmqpContextResolver, Context, NeutronApiBase, PluginConfig, PluginContextResolver,
};
use calico_relation::RelationStore;
use calico_render::{ContextGenerator, Result};

/// The Calico network-plugin context, composed over the Neutron API base
pub struct PluginGenerator {
    cfg: PluginConfig,
    private_address: IpAddr,
}

impl PluginGenerator {
    pub fn new(cfg: PluginConfig, private_address: IpAddr) -> Self {
        Self {
            cfg,
            private_address,
        }
    }
}

impl ContextGenerator for PluginGenerator {
    fn name(&self) -> &str {
        "calico-plugin"
    }

    fn generate(&self, store: &dyn RelationStore) -> Result<Context> {
        let base = NeutronApiBase::new();
        let resolver = PluginContextResolver::new(&base);
        Ok(resolver.resolve(store, &self.cfg, self.private_address)?)
    }
}

/// Message broker coordinates for the Neutron agents
pub struct AmqpGenerator {
    resolver: AmqpContextResolver,
}

impl AmqpGenerator {
    pub fn new(user: &str, vhost: &str) -> Self {
        Self {
            resolver: AmqpContextResolver::new(user, vhost),
        }
    }
}

impl ContextGenerator for AmqpGenerator {
    fn name(&self) -> &str {
        "amqp"
    }

    fn generate(&self, store: &dyn RelationStore) -> Result<Context> {
        Ok(self.resolver.resolve(store)?)
    }
}
