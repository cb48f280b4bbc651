use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::config::api::{Api, Policy, Stats};
use crate::config::dns::Dns;
use crate::config::inbound::Inbound;
use crate::config::log::Log;
use crate::config::outbound::Outbound;
use crate::config::route::Routing;
use crate::error::Result;

pub mod api;
pub mod dns;
pub mod inbound;
pub mod log;
pub mod outbound;
pub mod route;
pub mod util;
pub mod validation;

/// User level applied to inbounds and outbound users
pub const USER_LEVEL: u32 = 8;

/// Main engine configuration structure
///
/// This struct represents the complete engine configuration file. Sections
/// serialize in declaration order; the stats sections are omitted unless set.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    /// Log configuration
    pub log: Log,

    /// Local listeners
    pub inbounds: Vec<Inbound>,

    /// Outbounds; the first one receives unmatched traffic
    pub outbounds: Vec<Outbound>,

    /// DNS configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<Dns>,

    /// Routing configuration
    pub routing: Routing,

    /// Traffic counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,

    /// Management API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<Api>,

    /// Counter policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
}

impl EngineConfig {
    /// Create a configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Finds an outbound by tag
    pub fn outbound(&self, tag: &str) -> Option<&Outbound> {
        self.outbounds.iter().find(|outbound| outbound.tag == tag)
    }

    /// Serialize the configuration to JSON.
    ///
    /// `indent` is the number of spaces per level; `0` produces compact output.
    pub fn to_json(&self, indent: usize) -> Result<String> {
        to_json_with_indent(self, indent)
    }
}

/// Serialize any config value with `indent` spaces per level, compact when `0`
pub fn to_json_with_indent<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }

    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(
        &mut buf,
        PrettyFormatter::with_indent(indent.as_bytes()),
    );
    value.serialize(&mut serializer)?;

    String::from_utf8(buf).map_err(|e| {
        serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)).into()
    })
}

/// Builder for EngineConfig
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set log configuration
    pub fn log(mut self, log: Log) -> Self {
        self.config.log = log;
        self
    }

    /// Add an inbound
    pub fn inbound(mut self, inbound: Inbound) -> Self {
        self.config.inbounds.push(inbound);
        self
    }

    /// Add an outbound
    pub fn outbound(mut self, outbound: Outbound) -> Self {
        self.config.outbounds.push(outbound);
        self
    }

    /// Set DNS configuration
    pub fn dns(mut self, dns: Dns) -> Self {
        self.config.dns = Some(dns);
        self
    }

    /// Set routing configuration
    pub fn routing(mut self, routing: Routing) -> Self {
        self.config.routing = routing;
        self
    }

    /// Enable the stats API sections
    pub fn stats_api(mut self, api: Api, policy: Policy) -> Self {
        self.config.stats = Some(Stats::default());
        self.config.api = Some(api);
        self.config.policy = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
