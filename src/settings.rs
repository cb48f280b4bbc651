//! Assembler settings loaded from TOML
//!
//! Every field has a default, so an empty file (or no file) yields the
//! standard local setup: a SOCKS listener on `127.0.0.1:10808` and the stats
//! API port reserved at `10085`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::log::LogLevel;

// ============================================================================
// Settings Types
// ============================================================================

/// Settings parsed from a TOML file
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub log: LogOptions,
    pub inbound: InboundOptions,
    pub api: ApiOptions,
    pub routing: RoutingOptions,
    pub dns: DnsOptions,
}

/// `[log]` table
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct LogOptions {
    /// Engine log level, default "warning"
    pub level: LogLevel,

    /// Access log file path
    pub access: Option<String>,

    /// Error log file path
    pub error: Option<String>,
}

/// `[inbound]` table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InboundOptions {
    /// Listen address, default "127.0.0.1"
    pub listen: String,

    /// SOCKS listener port, default 10808
    pub port: u16,

    /// Relay UDP through the SOCKS listener
    pub udp: bool,

    /// Sniff http/tls destinations
    pub sniffing: bool,

    /// Also open an HTTP proxy listener on this port
    pub http_port: Option<u16>,
}

impl Default for InboundOptions {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1".to_string(),
            port: 10808,
            udp: true,
            sniffing: true,
            http_port: None,
        }
    }
}

/// `[api]` table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ApiOptions {
    /// Emit the stats/api/policy sections and the API listener
    pub enabled: bool,

    /// Stats API port, default 10085. Traffic to it is always routed direct.
    pub port: u16,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 10085,
        }
    }
}

/// `[routing]` table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RoutingOptions {
    /// Domain strategy, default "AsIs"
    pub domain_strategy: String,

    /// Domain matchers routed to `block`, e.g. "geosite:category-ads-all"
    pub block_domains: Vec<String>,

    /// IP matchers routed to `block`
    pub block_ips: Vec<String>,

    /// Route private and LAN addresses to `direct`
    pub bypass_lan: bool,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            domain_strategy: "AsIs".to_string(),
            block_domains: Vec::new(),
            block_ips: Vec::new(),
            bypass_lan: false,
        }
    }
}

/// `[dns]` table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DnsOptions {
    /// Upstream servers, default ["1.1.1.1", "8.8.8.8"]
    pub servers: Vec<String>,

    /// Static host mappings, domain to address
    pub hosts: BTreeMap<String, String>,

    /// `UseIP`, `UseIPv4` or `UseIPv6`
    pub query_strategy: Option<String>,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            hosts: BTreeMap::new(),
            query_strategy: None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("Failed to parse settings TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file path; `~` is expanded
    pub async fn load(path: &str) -> Result<Self> {
        let expanded = expand_tilde(path);
        let content = tokio::fs::read_to_string(Path::new(&expanded))
            .await
            .with_context(|| format!("Failed to read settings from {:?}", expanded))?;
        Self::from_toml(&content)
    }

    /// Check listener ports and the listen address
    pub fn validate(&self) -> Result<()> {
        self.inbound
            .listen
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid listen address: {}", self.inbound.listen))?;

        if self.inbound.port == 0 {
            bail!("inbound.port must not be 0");
        }
        if self.api.port == 0 {
            bail!("api.port must not be 0");
        }
        if self.inbound.port == self.api.port {
            bail!("inbound.port and api.port must differ ({})", self.api.port);
        }

        if let Some(http_port) = self.inbound.http_port {
            if http_port == 0 {
                bail!("inbound.http_port must not be 0");
            }
            if http_port == self.inbound.port || http_port == self.api.port {
                bail!("inbound.http_port {} collides with another port", http_port);
            }
        }

        if self.dns.servers.iter().any(|s| s.trim().is_empty()) {
            bail!("dns.servers must not contain empty entries");
        }
        if let Some(strategy) = &self.dns.query_strategy
            && !matches!(strategy.as_str(), "UseIP" | "UseIPv4" | "UseIPv6")
        {
            bail!("Invalid dns.query_strategy: {}", strategy);
        }

        Ok(())
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

/// Get home directory path
fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}
