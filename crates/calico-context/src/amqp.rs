//! AMQP broker context for the Neutron agents

use calico_relation::RelationStore;

use crate::context::Context;
use crate::error::Result;

const AMQP_RELATION: &str = "amqp";

/// Resolver for the message broker context.
///
/// Ready once any broker unit advertises both `hostname` and `password`;
/// user and vhost come from local charm config since we asked the broker to
/// create them on join.
#[derive(Debug, Clone)]
pub struct AmqpContextResolver {
    pub user: String,
    pub vhost: String,
}

impl AmqpContextResolver {
    pub fn new(user: impl Into<String>, vhost: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            vhost: vhost.into(),
        }
    }

    pub fn resolve(&self, store: &dyn RelationStore) -> Result<Context> {
        for rid in store.relation_ids(AMQP_RELATION)? {
            for unit in store.related_units(&rid)? {
                let hostname = store.get(&rid, &unit, "hostname")?;
                let password = store.get(&rid, &unit, "password")?;
                if let (Some(hostname), Some(password)) = (hostname, password) {
                    let mut ctx = Context::new();
                    ctx.insert("rabbitmq_host", hostname);
                    ctx.insert("rabbitmq_password", password);
                    ctx.insert("rabbitmq_user", self.user.as_str());
                    ctx.insert("rabbitmq_virtual_host", self.vhost.as_str());
                    return Ok(ctx);
                }
            }
        }
        tracing::debug!("amqp relation incomplete, peer not ready?");
        Ok(Context::new())
    }
}
