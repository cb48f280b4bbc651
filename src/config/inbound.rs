use serde::{Deserialize, Serialize};

use crate::config::USER_LEVEL;

// ============================================================================
// Inbound
// ============================================================================

/// Local listener configuration.
///
/// Serializes as `{"tag", "port", "listen", "protocol", "settings", "sniffing"}`.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Inbound {
    pub tag: String,
    pub port: u16,
    pub listen: String,
    #[serde(flatten)]
    pub settings: InboundSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniffing: Option<Sniffing>,
}

/// Inbound protocol together with its settings object
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", content = "settings", rename_all = "lowercase")]
pub enum InboundSettings {
    Socks(SocksInboundSettings),
    Http(HttpInboundSettings),
    /// Transparent forwarder, used for the stats API listener
    #[serde(rename = "dokodemo-door")]
    DokodemoDoor(DokodemoDoorSettings),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocksInboundSettings {
    /// `noauth` or `password`
    pub auth: String,
    pub udp: bool,
    pub user_level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpInboundSettings {
    pub user_level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DokodemoDoorSettings {
    pub address: String,
}

/// Destination sniffing. Lets domain rules match connections made by IP.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sniffing {
    pub enabled: bool,
    pub dest_override: Vec<String>,
}

impl Default for Sniffing {
    fn default() -> Self {
        Self {
            enabled: true,
            dest_override: vec!["http".to_string(), "tls".to_string()],
        }
    }
}

impl Inbound {
    /// Create an unauthenticated SOCKS listener
    pub fn socks(tag: impl Into<String>, listen: impl Into<String>, port: u16, udp: bool) -> Self {
        Self {
            tag: tag.into(),
            port,
            listen: listen.into(),
            settings: InboundSettings::Socks(SocksInboundSettings {
                auth: "noauth".to_string(),
                udp,
                user_level: USER_LEVEL,
            }),
            sniffing: None,
        }
    }

    /// Create an HTTP proxy listener
    pub fn http(tag: impl Into<String>, listen: impl Into<String>, port: u16) -> Self {
        Self {
            tag: tag.into(),
            port,
            listen: listen.into(),
            settings: InboundSettings::Http(HttpInboundSettings {
                user_level: USER_LEVEL,
            }),
            sniffing: None,
        }
    }

    /// Create a dokodemo-door listener forwarding to `address`
    pub fn dokodemo_door(
        tag: impl Into<String>,
        listen: impl Into<String>,
        port: u16,
        address: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            port,
            listen: listen.into(),
            settings: InboundSettings::DokodemoDoor(DokodemoDoorSettings {
                address: address.into(),
            }),
            sniffing: None,
        }
    }

    /// Enable http/tls sniffing
    pub fn with_sniffing(mut self) -> Self {
        self.sniffing = Some(Sniffing::default());
        self
    }
}
