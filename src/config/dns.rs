use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// DNS configuration for the engine's built-in resolver
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dns {
    /// Static host mappings, domain to address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, String>,

    /// Upstream servers, tried in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<String>,

    /// Resolution strategy: `UseIP`, `UseIPv4` or `UseIPv6`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_strategy: Option<String>,
}

impl Dns {
    /// Create a DNS section with the given upstream servers
    pub fn new(servers: Vec<String>) -> Self {
        Self {
            servers,
            ..Default::default()
        }
    }

    /// Add a static host mapping
    pub fn with_host(mut self, domain: impl Into<String>, address: impl Into<String>) -> Self {
        self.hosts.insert(domain.into(), address.into());
        self
    }
}
