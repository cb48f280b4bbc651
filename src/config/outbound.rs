use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::util::is_false;

// ============================================================================
// Outbound
// ============================================================================

/// Outbound configuration
///
/// Serializes as `{"tag", "protocol", "settings", "streamSettings", "mux"}`.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    pub tag: String,
    #[serde(flatten)]
    pub settings: OutboundSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<Mux>,
}

/// Outbound protocol together with its settings object
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "protocol", content = "settings", rename_all = "lowercase")]
pub enum OutboundSettings {
    VMess(VNextSettings),
    VLess(VNextSettings),
    Trojan(TrojanSettings),
    Shadowsocks(ShadowsocksSettings),
    Socks(SocksSettings),
    /// Direct connection
    Freedom(FreedomSettings),
    /// Drops all traffic
    Blackhole(BlackholeSettings),
}

impl OutboundSettings {
    /// Protocol name as written in the `protocol` field
    pub fn protocol(&self) -> &'static str {
        match self {
            OutboundSettings::VMess(_) => "vmess",
            OutboundSettings::VLess(_) => "vless",
            OutboundSettings::Trojan(_) => "trojan",
            OutboundSettings::Shadowsocks(_) => "shadowsocks",
            OutboundSettings::Socks(_) => "socks",
            OutboundSettings::Freedom(_) => "freedom",
            OutboundSettings::Blackhole(_) => "blackhole",
        }
    }
}

impl Outbound {
    /// Create an outbound without stream settings or mux
    pub fn new(tag: impl Into<String>, settings: OutboundSettings) -> Self {
        Self {
            tag: tag.into(),
            settings,
            stream_settings: None,
            mux: None,
        }
    }

    /// Create a direct (freedom) outbound
    pub fn freedom(tag: impl Into<String>) -> Self {
        Self::new(tag, OutboundSettings::Freedom(FreedomSettings::default()))
    }

    /// Create a blocking (blackhole) outbound
    pub fn blackhole(tag: impl Into<String>) -> Self {
        Self::new(tag, OutboundSettings::Blackhole(BlackholeSettings::default()))
    }

    pub fn with_stream_settings(mut self, stream_settings: StreamSettings) -> Self {
        self.stream_settings = Some(stream_settings);
        self
    }

    pub fn with_mux(mut self, mux: Mux) -> Self {
        self.mux = Some(mux);
        self
    }

    pub fn protocol(&self) -> &'static str {
        self.settings.protocol()
    }
}

// ============================================================================
// Protocol Settings
// ============================================================================

/// Settings shared by vmess and vless
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VNextSettings {
    pub vnext: Vec<VNextServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VNextServer {
    pub address: String,
    pub port: u16,
    pub users: Vec<VNextUser>,
}

/// A vmess or vless user.
///
/// vmess fills `alter_id` and `security`; vless fills `encryption` and `flow`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VNextUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrojanSettings {
    pub servers: Vec<TrojanServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrojanServer {
    pub address: String,
    pub port: u16,
    pub password: String,
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShadowsocksSettings {
    pub servers: Vec<ShadowsocksServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShadowsocksServer {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SocksSettings {
    pub servers: Vec<SocksServer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SocksServer {
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<SocksUser>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SocksUser {
    pub user: String,
    pub pass: String,
    pub level: u32,
}

/// Sends traffic to its original destination
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FreedomSettings {}

/// Closes connections silently
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BlackholeSettings {}

// ============================================================================
// Stream Settings
// ============================================================================

/// Transport and security layer of an outbound
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    /// `tcp`, `ws`, `h2`, `grpc`, `quic` or `kcp`
    pub network: String,
    /// `none`, `tls` or `reality`
    pub security: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_settings: Option<TlsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_settings: Option<RealitySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_settings: Option<TcpSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<WsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_settings: Option<HttpSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_settings: Option<GrpcSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quic_settings: Option<QuicSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kcp_settings: Option<KcpSettings>,
}

impl StreamSettings {
    /// Create stream settings for a network with no security layer
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            security: "none".to_string(),
            tls_settings: None,
            reality_settings: None,
            tcp_settings: None,
            ws_settings: None,
            http_settings: None,
            grpc_settings: None,
            quic_settings: None,
            kcp_settings: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.security = "tls".to_string();
        self.tls_settings = Some(tls);
        self.reality_settings = None;
        self
    }

    pub fn with_reality(mut self, reality: RealitySettings) -> Self {
        self.security = "reality".to_string();
        self.reality_settings = Some(reality);
        self.tls_settings = None;
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub allow_insecure: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealitySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
}

/// Header obfuscation object used by tcp, quic and kcp
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HeaderObject {
    /// `none`, `http`, `srtp`, `utp`, `wechat-video`, `dtls` or `wireguard`
    #[serde(rename = "type")]
    pub header_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpHeaderRequest>,
}

impl HeaderObject {
    pub fn new(header_type: impl Into<String>) -> Self {
        Self {
            header_type: header_type.into(),
            request: None,
        }
    }
}

impl Default for HeaderObject {
    fn default() -> Self {
        Self::new("none")
    }
}

/// Fake HTTP request used by the tcp `http` header
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpHeaderRequest {
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TcpSettings {
    pub header: HeaderObject,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WsSettings {
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    pub path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcSettings {
    pub service_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi_mode: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuicSettings {
    pub security: String,
    pub key: String,
    pub header: HeaderObject,
}

impl Default for QuicSettings {
    fn default() -> Self {
        Self {
            security: "none".to_string(),
            key: String::new(),
            header: HeaderObject::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KcpSettings {
    pub mtu: u32,
    pub tti: u32,
    pub uplink_capacity: u32,
    pub downlink_capacity: u32,
    pub congestion: bool,
    pub read_buffer_size: u32,
    pub write_buffer_size: u32,
    pub header: HeaderObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl Default for KcpSettings {
    fn default() -> Self {
        Self {
            mtu: 1350,
            tti: 50,
            uplink_capacity: 12,
            downlink_capacity: 100,
            congestion: false,
            read_buffer_size: 1,
            write_buffer_size: 1,
            header: HeaderObject::default(),
            seed: None,
        }
    }
}

// ============================================================================
// Mux
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Mux {
    pub enabled: bool,
    pub concurrency: i32,
}

impl Mux {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            concurrency: 8,
        }
    }
}
