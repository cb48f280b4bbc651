//! VMess protocol parser
//!
//! This module provides parsing for VMess (vmess://) URIs.
//! VMess URIs are Base64 encoded JSON containing connection details.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::util::is_false;
use crate::descriptor::{
    Extra, Identity, Network, Protocol, ProxyDescriptor, Security, SecurityLayer, Transport,
};
use crate::error::{ParseError, Result};
use crate::parser::base64::{decode_base64_text, encode_base64};

use super::{ProtocolParser, split_fragment, split_list};

// ============================================================================
// VMess Parser
// ============================================================================

/// Parser for VMess (vmess://) URIs
///
/// VMess URIs are Base64 encoded JSON:
/// vmess://BASE64({ "v": "2", "ps": "name", "add": "host", "port": 443, ... })
pub struct VMessParser;

/// VMess URI JSON structure (v2 layout)
#[derive(Serialize, Deserialize, Debug, Default)]
struct VMessJson {
    /// Version, "2" or 2
    #[serde(default, deserialize_with = "deserialize_text")]
    v: String,
    /// Remark/name
    #[serde(default, deserialize_with = "deserialize_text")]
    ps: String,
    /// Server address
    add: String,
    /// Server port (can be string or number)
    #[serde(deserialize_with = "deserialize_port")]
    port: u16,
    /// UUID
    id: String,
    /// Alter ID (can be string or number)
    #[serde(
        default,
        deserialize_with = "deserialize_option_u16",
        skip_serializing_if = "Option::is_none"
    )]
    aid: Option<u16>,
    /// Encryption cipher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scy: Option<String>,
    /// Network type (tcp, ws, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    net: Option<String>,
    /// Header type (tcp/kcp/quic) or gRPC mode
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    header_type: Option<String>,
    /// Host header, or quic security
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    /// Request path, gRPC service name, quic key or kcp seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    /// TLS setting: "tls", "reality" or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sni: Option<String>,
    /// Comma separated ALPN list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alpn: Option<String>,
    /// Fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pbk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spx: Option<String>,
    /// gRPC service name
    #[serde(
        default,
        rename = "serviceName",
        skip_serializing_if = "Option::is_none"
    )]
    service_name: Option<String>,
    /// gRPC mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(
        default,
        rename = "allowInsecure",
        alias = "insecure",
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "is_false"
    )]
    allow_insecure: bool,
}

impl ProtocolParser for VMessParser {
    fn scheme(&self) -> &'static str {
        "vmess"
    }

    fn protocol(&self) -> Protocol {
        Protocol::VMess
    }

    fn parse(&self, uri: &str) -> Result<ProxyDescriptor> {
        let uri = uri.trim();
        trace!("Parsing VMess URI");

        let (encoded, fragment) = split_fragment(self.strip_scheme(uri)?);

        let decoded = decode_base64_text(encoded).ok_or_else(|| {
            ParseError::invalid(Protocol::VMess, "payload is not valid Base64 encoded UTF-8")
        })?;

        trace!("Decoded VMess JSON: {}", decoded);

        let json: VMessJson = serde_json::from_str(&decoded).map_err(|e| {
            ParseError::invalid(Protocol::VMess, format!("invalid JSON payload: {e}"))
        })?;

        trace!(
            "VMess config: server={}:{}, uuid={}, net={:?}, tls={:?}",
            json.add, json.port, json.id, json.net, json.tls
        );

        if json.id.trim().is_empty() {
            return Err(ParseError::invalid(Protocol::VMess, "missing user id"));
        }

        let security = self.build_security(&json)?;
        let transport = self.build_transport(&json)?;

        let remark = if json.ps.is_empty() {
            fragment
        } else {
            json.ps
        };

        let extra = Extra::VMess {
            alter_id: json.aid.unwrap_or(0),
            cipher: json
                .scy
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "auto".to_string()),
        };

        Ok(
            ProxyDescriptor::new(Protocol::VMess, json.add, json.port, Identity::Uuid(json.id))?
                .with_remark(remark)
                .with_transport(transport)
                .with_security(security)
                .with_extra(extra),
        )
    }
}

impl VMessParser {
    fn build_security(&self, json: &VMessJson) -> Result<Option<Security>> {
        let layer = match json.tls.as_deref().unwrap_or("") {
            "" | "none" => return Ok(None),
            "tls" | "xtls" => SecurityLayer::Tls,
            "reality" => SecurityLayer::Reality {
                public_key: json
                    .pbk
                    .clone()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ParseError::invalid(Protocol::VMess, "reality requires pbk"))?,
                short_id: json.sid.clone().filter(|s| !s.is_empty()),
                spider_x: json.spx.clone().filter(|s| !s.is_empty()),
            },
            other => {
                return Err(ParseError::invalid(
                    Protocol::VMess,
                    format!("unsupported security: {other}"),
                ));
            }
        };

        Ok(Some(Security {
            layer,
            sni: json.sni.clone().filter(|s| !s.is_empty()),
            alpn: split_list(json.alpn.as_deref()),
            fingerprint: json.fp.clone().filter(|s| !s.is_empty()),
            allow_insecure: json.allow_insecure,
        }))
    }

    fn build_transport(&self, json: &VMessJson) -> Result<Transport> {
        let name = json.net.as_deref().unwrap_or("tcp");
        let network = Network::from_link_name(name).ok_or_else(|| {
            ParseError::invalid(Protocol::VMess, format!("unsupported transport: {name}"))
        })?;

        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let mut transport = Transport::new(network);
        transport.host = non_empty(&json.host);

        match network {
            Network::Grpc => {
                transport.service_name = non_empty(&json.service_name).or(non_empty(&json.path));
                transport.mode = non_empty(&json.mode).or(non_empty(&json.header_type));
            }
            Network::Kcp => {
                transport.seed = non_empty(&json.path);
                transport.header_type = non_empty(&json.header_type).filter(|h| h != "none");
            }
            _ => {
                transport.path = non_empty(&json.path);
                transport.header_type = non_empty(&json.header_type).filter(|h| h != "none");
            }
        }

        Ok(transport)
    }

    /// Renders a vmess descriptor back into a `vmess://` link.
    ///
    /// Parsing the returned link yields a descriptor equal to `descriptor`.
    pub fn to_link(&self, descriptor: &ProxyDescriptor) -> Result<String> {
        let id = match (descriptor.protocol(), descriptor.identity()) {
            (Protocol::VMess, Identity::Uuid(id)) => id,
            (other, _) => {
                return Err(ParseError::invalid(
                    other,
                    "only vmess descriptors can be encoded as vmess links",
                ));
            }
        };

        let mut json = VMessJson {
            v: "2".to_string(),
            ps: descriptor.remark().to_string(),
            add: descriptor.address().to_string(),
            port: descriptor.port(),
            id: id.clone(),
            ..Default::default()
        };

        if let Extra::VMess { alter_id, cipher } = descriptor.extra() {
            json.aid = Some(*alter_id);
            json.scy = Some(cipher.clone());
        }

        if let Some(transport) = descriptor.transport() {
            json.net = Some(transport.network.as_str().to_string());
            json.host = transport.host.clone();
            match transport.network {
                Network::Grpc => {
                    json.service_name = transport.service_name.clone();
                    json.mode = transport.mode.clone();
                }
                Network::Kcp => {
                    json.path = transport.seed.clone();
                    json.header_type = transport.header_type.clone();
                }
                _ => {
                    json.path = transport.path.clone();
                    json.header_type = transport.header_type.clone();
                }
            }
        }

        if let Some(security) = descriptor.security() {
            json.tls = Some(security.as_str().to_string());
            json.sni = security.sni.clone();
            json.fp = security.fingerprint.clone();
            json.allow_insecure = security.allow_insecure;
            if !security.alpn.is_empty() {
                json.alpn = Some(security.alpn.join(","));
            }
            if let SecurityLayer::Reality {
                public_key,
                short_id,
                spider_x,
            } = &security.layer
            {
                json.pbk = Some(public_key.clone());
                json.sid = short_id.clone();
                json.spx = spider_x.clone();
            }
        }

        let payload = serde_json::to_string(&json)?;
        Ok(format!("vmess://{}", encode_base64(payload)))
    }
}

// ============================================================================
// Deserialization Helpers
// ============================================================================

/// Custom deserializer for port (handles both string and number)
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        String(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Custom deserializer for free text that may arrive as a number or `null`
fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextValue {
        String(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    Ok(match Option::<TextValue>::deserialize(deserializer)? {
        Some(TextValue::String(s)) => s,
        Some(TextValue::Number(n)) => n.to_string(),
        Some(TextValue::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}

/// Custom deserializer for optional u16 (handles both string and number)
fn deserialize_option_u16<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U16Value {
        Number(u16),
        String(String),
    }

    match Option::<U16Value>::deserialize(deserializer)? {
        Some(U16Value::Number(n)) => Ok(Some(n)),
        Some(U16Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(U16Value::String(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Custom deserializer for flags written as bool, number or string
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagValue {
        Bool(bool),
        Number(u64),
        String(String),
    }

    Ok(match Option::<FlagValue>::deserialize(deserializer)? {
        Some(FlagValue::Bool(b)) => b,
        Some(FlagValue::Number(n)) => n != 0,
        Some(FlagValue::String(s)) => super::is_truthy(&s),
        None => false,
    })
}
