//! Charm configuration
//!
//! Loaded fresh from the hook environment (`config-get --format=json`) on
//! every pass; nothing global, nothing cached.

use calico_context::PluginConfig;
use calico_relation::HookEnv;
use serde::Deserialize;

use crate::error::Result;

fn default_rabbit_user() -> String {
    "neutron".to_string()
}

fn default_rabbit_vhost() -> String {
    "openstack".to_string()
}

/// The operator-facing configuration surface of the charm
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CharmConfig {
    /// CIDR selecting the data network used for BGP peering
    pub os_data_network: Option<String>,
    pub use_syslog: bool,
    pub verbose: bool,
    pub debug: bool,
    /// Also manage an IPv6 routing daemon config
    pub enable_ipv6: bool,
    pub disable_calico_usage_reporting: bool,
    /// Package source override for Calico packages
    pub calico_origin: Option<String>,
    /// Package source selector for the OpenStack release
    pub openstack_origin: Option<String>,
    /// Optional direct URL to an etcd package to install
    pub etcd_package_url: Option<String>,
    #[serde(default = "default_rabbit_user")]
    pub rabbit_user: String,
    #[serde(default = "default_rabbit_vhost")]
    pub rabbit_vhost: String,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            os_data_network: None,
            use_syslog: false,
            verbose: false,
            debug: false,
            enable_ipv6: false,
            disable_calico_usage_reporting: false,
            calico_origin: None,
            openstack_origin: None,
            etcd_package_url: None,
            rabbit_user: default_rabbit_user(),
            rabbit_vhost: default_rabbit_vhost(),
        }
    }
}

impl CharmConfig {
    /// Load the current configuration from the hook environment
    pub fn load(env: &HookEnv) -> Result<Self> {
        let value = env.config_json()?;
        Ok(serde_json::from_value(value)?)
    }

    /// The subset consumed by the plugin context resolver
    pub fn plugin_config(&self) -> PluginConfig {
        PluginConfig {
            os_data_network: self.os_data_network.clone(),
            use_syslog: self.use_syslog,
            verbose: self.verbose,
            debug: self.debug,
            disable_usage_reporting: self.disable_calico_usage_reporting,
        }
    }
}
