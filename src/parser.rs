//! Share Link Parsing Module
//!
//! This module provides functionality for:
//! - Detecting the scheme of a share link (vmess://, vless://, trojan://, ss://, socks://)
//! - Dispatching the link to the decoder for that scheme
//! - Parsing newline separated link lists
//!
//! Every decoder produces a [`ProxyDescriptor`]; failures are reported as
//! [`ParseError`] and never panic.

pub mod base64;
pub mod protocols;

use std::fmt;

use tracing::{debug, warn};

use crate::descriptor::{Protocol, ProxyDescriptor};
use crate::error::{ParseError, Result};

use protocols::{
    ProtocolParser, ShadowsocksParser, SocksParser, TrojanParser, VLessParser, VMessParser,
};

// ============================================================================
// Scheme Detection
// ============================================================================

/// Supported share link schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    VMess,
    VLess,
    Trojan,
    Shadowsocks,
    Socks,
}

impl Scheme {
    /// All supported schemes
    pub const ALL: [Scheme; 5] = [
        Scheme::VMess,
        Scheme::VLess,
        Scheme::Trojan,
        Scheme::Shadowsocks,
        Scheme::Socks,
    ];

    /// The exact, case-sensitive link prefix including `://`
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::VMess => "vmess://",
            Scheme::VLess => "vless://",
            Scheme::Trojan => "trojan://",
            Scheme::Shadowsocks => "ss://",
            Scheme::Socks => "socks://",
        }
    }

    /// Protocol of descriptors decoded from this scheme
    pub fn protocol(&self) -> Protocol {
        match self {
            Scheme::VMess => Protocol::VMess,
            Scheme::VLess => Protocol::VLess,
            Scheme::Trojan => Protocol::Trojan,
            Scheme::Shadowsocks => Protocol::Shadowsocks,
            Scheme::Socks => Protocol::Socks,
        }
    }

    /// Detects the scheme of a trimmed link.
    ///
    /// Unknown or missing schemes yield [`ParseError::UnsupportedScheme`]
    /// carrying the text before `://`, or the whole input when there is none.
    pub fn detect(uri: &str) -> Result<Scheme> {
        Scheme::ALL
            .into_iter()
            .find(|scheme| uri.starts_with(scheme.prefix()))
            .ok_or_else(|| {
                let scheme = uri.split_once("://").map_or(uri, |(scheme, _)| scheme);
                ParseError::UnsupportedScheme(scheme.to_string())
            })
    }

    /// Runs the decoder for this scheme
    pub fn decode(&self, uri: &str) -> Result<ProxyDescriptor> {
        match self {
            Scheme::VMess => VMessParser.parse(uri),
            Scheme::VLess => VLessParser.parse(uri),
            Scheme::Trojan => TrojanParser.parse(uri),
            Scheme::Shadowsocks => ShadowsocksParser.parse(uri),
            Scheme::Socks => SocksParser.parse(uri),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches("://"))
    }
}

// ============================================================================
// Link Parsing
// ============================================================================

/// Parses a single share link into a descriptor
pub fn parse(uri: &str) -> Result<ProxyDescriptor> {
    let uri = uri.trim();
    let scheme = Scheme::detect(uri)?;
    debug!("Parsing {} link ({} bytes)", scheme, uri.len());

    let result = scheme.decode(uri);
    match &result {
        Ok(descriptor) => debug!(
            "Successfully parsed {} link -> {}:{} '{}'",
            scheme,
            descriptor.address(),
            descriptor.port(),
            descriptor.remark()
        ),
        Err(e) => debug!("Failed to parse {} link: {}", scheme, e),
    }
    result
}

/// Parses one link per line, skipping blank lines and `#` comments
pub fn parse_link_list(content: &str) -> Vec<Result<ProxyDescriptor>> {
    let lines: Vec<&str> = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    debug!("Parsing {} link lines", lines.len());

    lines.into_iter().map(parse).collect()
}

/// Parses a link list, keeping only the successful results
pub fn parse_link_list_lossy(content: &str) -> Vec<ProxyDescriptor> {
    let results = parse_link_list(content);
    let total = results.len();

    let descriptors: Vec<ProxyDescriptor> = results
        .into_iter()
        .filter_map(|r| match r {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Skipping link: {}", e);
                None
            }
        })
        .collect();

    debug!(
        "Link list parsing complete: {} total, {} successful, {} failed",
        total,
        descriptors.len(),
        total - descriptors.len()
    );

    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;

    const VMESS_SAMPLE: &str = "vmess://eyJ2IjoiMiIsInBzIjoibXlzZXJ2ZXIiLCJhZGQiOiIxLjIuMy40IiwicG9ydCI6NDQzLCJpZCI6ImFhYWEtYmJiYi1jY2NjIiwibmV0IjoidGNwIn0=";

    #[test]
    fn test_detect_each_scheme() {
        assert_eq!(Scheme::detect(VMESS_SAMPLE).unwrap(), Scheme::VMess);
        assert_eq!(Scheme::detect("vless://u@h:1").unwrap(), Scheme::VLess);
        assert_eq!(Scheme::detect("trojan://p@h:1").unwrap(), Scheme::Trojan);
        assert_eq!(Scheme::detect("ss://abc").unwrap(), Scheme::Shadowsocks);
        assert_eq!(Scheme::detect("socks://h:1").unwrap(), Scheme::Socks);
    }

    #[test]
    fn test_detect_unsupported() {
        if let Err(ParseError::UnsupportedScheme(scheme)) = Scheme::detect("vmess2://abc") {
            assert_eq!(scheme, "vmess2");
        } else {
            panic!("Expected UnsupportedScheme");
        }

        if let Err(ParseError::UnsupportedScheme(scheme)) = Scheme::detect("http://example.com") {
            assert_eq!(scheme, "http");
        } else {
            panic!("Expected UnsupportedScheme");
        }

        if let Err(ParseError::UnsupportedScheme(scheme)) = Scheme::detect("garbage") {
            assert_eq!(scheme, "garbage");
        } else {
            panic!("Expected UnsupportedScheme");
        }
    }

    #[test]
    fn test_detect_is_case_sensitive() {
        assert!(Scheme::detect("VLESS://u@h:1").is_err());
        assert!(Scheme::detect("socks5://h:1").is_err());
    }

    #[test]
    fn test_scheme_protocol_and_display() {
        for scheme in Scheme::ALL {
            assert!(scheme.prefix().ends_with("://"));
        }
        assert_eq!(Scheme::Shadowsocks.protocol(), Protocol::Shadowsocks);
        assert_eq!(Scheme::Shadowsocks.to_string(), "ss");
        assert_eq!(Scheme::VMess.to_string(), "vmess");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let d = parse("  \ttrojan://p4ssw0rd@example.com:443#MyNode\n").unwrap();
        assert_eq!(d.protocol(), Protocol::Trojan);
        assert_eq!(d.remark(), "MyNode");
    }

    #[test]
    fn test_parse_propagates_decoder_error() {
        let err = parse("vmess://not-valid-base64!!").unwrap_err();
        assert!(matches!(
            err,
            ParseError::ParseUri {
                protocol: Protocol::VMess,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_link_list() {
        let content = format!(
            "# my servers\n{VMESS_SAMPLE}\n\nhttp://example.com\nss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#MyNode\n"
        );
        let results = parse_link_list(&content);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());

        let descriptors = parse_link_list_lossy(&content);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].address(), "1.2.3.4");
        assert_eq!(descriptors[1].protocol(), Protocol::Shadowsocks);
    }

    #[test]
    fn test_parse_link_list_empty() {
        assert!(parse_link_list("").is_empty());
        assert!(parse_link_list_lossy("\n# only a comment\n").is_empty());
    }
}
