//! Protocol-agnostic proxy descriptor
//!
//! A [`ProxyDescriptor`] is what every share link decoder produces. It can
//! only be built through [`ProxyDescriptor::new`], which validates the server
//! address, the port and that the credential matches the protocol.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{ParseError, Result};

// ============================================================================
// Protocol
// ============================================================================

/// Proxy protocol carried by a share link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    VMess,
    VLess,
    Trojan,
    Shadowsocks,
    Socks,
}

impl Protocol {
    /// Protocol name as used by the engine's `protocol` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::VMess => "vmess",
            Protocol::VLess => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Shadowsocks => "shadowsocks",
            Protocol::Socks => "socks",
        }
    }

    /// Whether the protocol runs over a configurable transport and security layer
    pub fn supports_stream_settings(&self) -> bool {
        matches!(self, Protocol::VMess | Protocol::VLess | Protocol::Trojan)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Socks username/password pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksAuth {
    pub user: String,
    pub pass: String,
}

/// Protocol-specific credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// User id for vmess and vless
    Uuid(String),
    /// Trojan password
    Password(String),
    /// Shadowsocks cipher and password
    Cipher { method: String, password: String },
    /// Optional socks credentials, `None` for anonymous access
    Socks(Option<SocksAuth>),
}

impl Identity {
    fn matches(&self, protocol: Protocol) -> bool {
        matches!(
            (self, protocol),
            (Identity::Uuid(_), Protocol::VMess | Protocol::VLess)
                | (Identity::Password(_), Protocol::Trojan)
                | (Identity::Cipher { .. }, Protocol::Shadowsocks)
                | (Identity::Socks(_), Protocol::Socks)
        )
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Stream transport between client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Tcp,
    WebSocket,
    Http2,
    Grpc,
    Quic,
    Kcp,
}

impl Network {
    /// Maps the network names found in share links (`ws`, `h2`, `gun`, ...)
    pub fn from_link_name(name: &str) -> Option<Self> {
        match name {
            "" | "tcp" | "raw" => Some(Network::Tcp),
            "ws" | "websocket" => Some(Network::WebSocket),
            "h2" | "http" => Some(Network::Http2),
            "grpc" | "gun" => Some(Network::Grpc),
            "quic" => Some(Network::Quic),
            "kcp" | "mkcp" => Some(Network::Kcp),
            _ => None,
        }
    }

    /// Network name as used in the engine's `streamSettings.network`
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::WebSocket => "ws",
            Network::Http2 => "h2",
            Network::Grpc => "grpc",
            Network::Quic => "quic",
            Network::Kcp => "kcp",
        }
    }
}

/// Transport selection plus transport-specific options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transport {
    pub network: Network,
    /// Request path (ws, h2) or key (quic)
    pub path: Option<String>,
    /// Host header (ws, h2, tcp http obfuscation) or quic security
    pub host: Option<String>,
    pub service_name: Option<String>,
    /// Header obfuscation type (tcp, kcp, quic)
    pub header_type: Option<String>,
    /// mKCP seed
    pub seed: Option<String>,
    /// gRPC mode, `multi` enables multi mode
    pub mode: Option<String>,
}

impl Transport {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }
}

// ============================================================================
// Security
// ============================================================================

/// Security layer wrapped around the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityLayer {
    Tls,
    Reality {
        public_key: String,
        short_id: Option<String>,
        spider_x: Option<String>,
    },
}

/// TLS/Reality options; an absent `Security` means no security layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Security {
    pub layer: SecurityLayer,
    pub sni: Option<String>,
    pub alpn: Vec<String>,
    pub fingerprint: Option<String>,
    pub allow_insecure: bool,
}

impl Security {
    pub fn new(layer: SecurityLayer) -> Self {
        Self {
            layer,
            sni: None,
            alpn: Vec::new(),
            fingerprint: None,
            allow_insecure: false,
        }
    }

    /// Security name as used in the engine's `streamSettings.security`
    pub fn as_str(&self) -> &'static str {
        match self.layer {
            SecurityLayer::Tls => "tls",
            SecurityLayer::Reality { .. } => "reality",
        }
    }
}

// ============================================================================
// Extra
// ============================================================================

/// Protocol-specific scalars that do not generalize
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extra {
    #[default]
    None,
    VMess {
        alter_id: u16,
        cipher: String,
    },
    VLess {
        flow: Option<String>,
        encryption: String,
    },
}

impl Extra {
    pub fn vmess_default() -> Self {
        Extra::VMess {
            alter_id: 0,
            cipher: "auto".to_string(),
        }
    }

    pub fn vless_default() -> Self {
        Extra::VLess {
            flow: None,
            encryption: "none".to_string(),
        }
    }
}

// ============================================================================
// Address Classification
// ============================================================================

/// Kind of server address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Ipv4,
    Ipv6,
    Domain,
}

/// Classifies a host as an IP literal or a domain name.
///
/// Brackets around IPv6 literals are tolerated.
pub fn classify_address(address: &str) -> AddressKind {
    let addr = address.trim_start_matches('[').trim_end_matches(']');
    if addr.parse::<Ipv4Addr>().is_ok() {
        AddressKind::Ipv4
    } else if addr.parse::<Ipv6Addr>().is_ok() {
        AddressKind::Ipv6
    } else {
        AddressKind::Domain
    }
}

// ============================================================================
// Proxy Descriptor
// ============================================================================

/// Canonical, protocol-agnostic result of decoding one share link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    protocol: Protocol,
    address: String,
    port: u16,
    remark: String,
    identity: Identity,
    transport: Option<Transport>,
    security: Option<Security>,
    extra: Extra,
}

impl ProxyDescriptor {
    /// Creates a validated descriptor.
    ///
    /// The address must be non-empty, the port non-zero and the identity must
    /// be the variant used by `protocol`. Brackets around IPv6 literals are
    /// stripped.
    pub fn new(
        protocol: Protocol,
        address: impl Into<String>,
        port: u16,
        identity: Identity,
    ) -> Result<Self> {
        let address = address.into();
        let address = address
            .strip_prefix('[')
            .and_then(|a| a.strip_suffix(']'))
            .map(str::to_string)
            .unwrap_or(address);

        if address.trim().is_empty() {
            return Err(ParseError::invalid(protocol, "missing server address"));
        }
        if port == 0 {
            return Err(ParseError::invalid(protocol, "port must be in 1..=65535"));
        }
        if !identity.matches(protocol) {
            return Err(ParseError::invalid(
                protocol,
                "credential does not match protocol",
            ));
        }

        let extra = match protocol {
            Protocol::VMess => Extra::vmess_default(),
            Protocol::VLess => Extra::vless_default(),
            _ => Extra::None,
        };

        Ok(Self {
            protocol,
            address,
            port,
            remark: String::new(),
            identity,
            transport: None,
            security: None,
            extra,
        })
    }

    /// Set the remark
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Set the transport; ignored for protocols without stream settings
    pub fn with_transport(mut self, transport: Transport) -> Self {
        if self.protocol.supports_stream_settings() {
            self.transport = Some(transport);
        }
        self
    }

    /// Set the security layer; ignored for protocols without stream settings
    pub fn with_security(mut self, security: Option<Security>) -> Self {
        if self.protocol.supports_stream_settings() {
            self.security = security;
        }
        self
    }

    /// Set protocol-specific extras; ignored when the variant does not fit
    pub fn with_extra(mut self, extra: Extra) -> Self {
        let fits = matches!(
            (&extra, self.protocol),
            (Extra::VMess { .. }, Protocol::VMess) | (Extra::VLess { .. }, Protocol::VLess)
        );
        if fits {
            self.extra = extra;
        }
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    pub fn security(&self) -> Option<&Security> {
        self.security.as_ref()
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn address_kind(&self) -> AddressKind {
        classify_address(&self.address)
    }
}
