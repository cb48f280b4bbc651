//! Protocol decoders
//!
//! One decoder per share link scheme. Each implements [`ProtocolParser`] and
//! turns a raw link into a validated [`ProxyDescriptor`]. The helpers at the
//! bottom of this module hold the query-parameter handling shared by the
//! vless and trojan decoders.

mod shadowsocks;
mod socks;
mod trojan;
mod vless;
mod vmess;

pub use shadowsocks::ShadowsocksParser;
pub use socks::SocksParser;
pub use trojan::TrojanParser;
pub use vless::VLessParser;
pub use vmess::VMessParser;

use std::collections::HashMap;

use url::{Host, Url};

use crate::descriptor::{Network, Protocol, ProxyDescriptor, Security, SecurityLayer, Transport};
use crate::error::{ParseError, Result};

// ============================================================================
// Protocol Parser Trait
// ============================================================================

/// Decodes share links of a single scheme
pub trait ProtocolParser {
    /// Scheme handled by this parser (e.g. "ss", "vmess")
    fn scheme(&self) -> &'static str;

    /// Protocol of the descriptors produced by this parser
    fn protocol(&self) -> Protocol;

    /// Parses a share link into a descriptor
    fn parse(&self, uri: &str) -> Result<ProxyDescriptor>;

    /// Returns the link body after `<scheme>://`
    fn strip_scheme<'a>(&self, uri: &'a str) -> Result<&'a str> {
        uri.strip_prefix(self.scheme())
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(|| {
                ParseError::invalid(
                    self.protocol(),
                    format!("missing {}:// prefix", self.scheme()),
                )
            })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Percent-decodes a link component, keeping the raw text if it is not valid UTF-8
pub fn decode_component(s: &str) -> String {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Splits off the `#fragment`, returning the body and the decoded remark
pub fn split_fragment(s: &str) -> (&str, String) {
    match s.split_once('#') {
        Some((body, fragment)) => (body, decode_component(fragment)),
        None => (s, String::new()),
    }
}

/// Parses host:port, handling IPv6 addresses in brackets
pub fn parse_host_port(protocol: Protocol, hostport: &str) -> Result<(String, u16)> {
    let (host, port_str) = if let Some(rest) = hostport.strip_prefix('[') {
        let bracket_end = rest
            .find(']')
            .ok_or_else(|| ParseError::invalid(protocol, "IPv6 address missing closing bracket"))?;
        let port_str = rest[bracket_end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| ParseError::invalid(protocol, "missing port after IPv6 address"))?;
        (&rest[..bracket_end], port_str)
    } else {
        hostport
            .rsplit_once(':')
            .ok_or_else(|| ParseError::invalid(protocol, "missing port"))?
    };

    if host.is_empty() {
        return Err(ParseError::invalid(protocol, "missing server address"));
    }

    let port: u16 = port_str
        .parse()
        .map_err(|_| ParseError::invalid(protocol, format!("invalid port: {port_str:?}")))?;

    Ok((host.to_string(), port))
}

/// Extracts host and port from a parsed URL, unbracketing IPv6 hosts
pub(crate) fn url_authority(protocol: Protocol, url: &Url) -> Result<(String, u16)> {
    let server = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(ParseError::invalid(protocol, "missing host")),
    };

    let port = url
        .port()
        .ok_or_else(|| ParseError::invalid(protocol, "missing port"))?;

    Ok((server, port))
}

/// Returns a non-empty parameter value
pub(crate) fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Splits a comma separated list such as `alpn=h2,http/1.1`
pub(crate) fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Interprets `1`/`true` flags
pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "True" | "TRUE")
}

/// Builds the security layer from `security`, `sni`, `fp`, `alpn`, `pbk`,
/// `sid`, `spx` and `allowInsecure` query parameters.
///
/// `default_security` applies when the link has no `security` parameter.
pub(crate) fn security_from_params(
    protocol: Protocol,
    params: &HashMap<String, String>,
    default_security: &str,
) -> Result<Option<Security>> {
    let kind = params
        .get("security")
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default_security);

    let layer = match kind {
        "none" => return Ok(None),
        "tls" | "xtls" => SecurityLayer::Tls,
        "reality" => SecurityLayer::Reality {
            public_key: non_empty(params.get("pbk"))
                .ok_or_else(|| ParseError::invalid(protocol, "reality requires pbk"))?,
            short_id: non_empty(params.get("sid")),
            spider_x: non_empty(params.get("spx")),
        },
        other => {
            return Err(ParseError::invalid(
                protocol,
                format!("unsupported security: {other}"),
            ));
        }
    };

    Ok(Some(Security {
        layer,
        sni: non_empty(params.get("sni")),
        alpn: split_list(params.get("alpn").map(|s| s.as_str())),
        fingerprint: non_empty(params.get("fp")),
        allow_insecure: params
            .get("allowInsecure")
            .or_else(|| params.get("insecure"))
            .is_some_and(|v| is_truthy(v)),
    }))
}

/// Builds the transport from `type`, `path`, `host`, `serviceName`,
/// `headerType`, `seed` and `mode` query parameters
pub(crate) fn transport_from_params(
    protocol: Protocol,
    params: &HashMap<String, String>,
) -> Result<Transport> {
    let name = params.get("type").map(|s| s.as_str()).unwrap_or("tcp");
    let network = Network::from_link_name(name)
        .ok_or_else(|| ParseError::invalid(protocol, format!("unsupported transport: {name}")))?;

    Ok(Transport {
        network,
        path: non_empty(params.get("path")),
        host: non_empty(params.get("host")),
        service_name: non_empty(params.get("serviceName")),
        header_type: non_empty(params.get("headerType")).filter(|h| h != "none"),
        seed: non_empty(params.get("seed")),
        mode: non_empty(params.get("mode")),
    })
}
