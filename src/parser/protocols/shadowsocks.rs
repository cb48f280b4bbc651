//! Shadowsocks protocol parser
//!
//! This module provides parsing for Shadowsocks (ss://) URIs.
//! Supports both the SIP002 shape and the legacy all-Base64 shape.

use tracing::trace;

use crate::descriptor::{Identity, Protocol, ProxyDescriptor};
use crate::error::{ParseError, Result};
use crate::parser::base64::decode_base64_text;

use super::{ProtocolParser, decode_component, parse_host_port, split_fragment};

// ============================================================================
// Shadowsocks Parser
// ============================================================================

/// Parser for Shadowsocks (ss://) URIs
///
/// - SIP002: ss://BASE64(method:password)@host:port#tag
/// - SIP002 with plain userinfo: ss://method:password@host:port#tag
/// - Legacy: ss://BASE64(method:password@host:port)#tag
///
/// A raw `@` in the link body always selects the SIP002 shape. SIP003
/// `plugin` query parameters are accepted and ignored.
pub struct ShadowsocksParser;

impl ProtocolParser for ShadowsocksParser {
    fn scheme(&self) -> &'static str {
        "ss"
    }

    fn protocol(&self) -> Protocol {
        Protocol::Shadowsocks
    }

    fn parse(&self, uri: &str) -> Result<ProxyDescriptor> {
        let uri = uri.trim();
        trace!("Parsing Shadowsocks URI");

        let body = self.strip_scheme(uri)?;
        let (main_part, remark) = split_fragment(body);

        let (method, password, server, server_port) = match main_part.rfind('@') {
            Some(at_pos) => {
                trace!("Parsing as SIP002 format (found @ separator)");
                self.parse_sip002(main_part, at_pos)?
            }
            None => {
                trace!("Parsing as legacy Base64 format");
                self.parse_legacy(main_part)?
            }
        };

        Ok(ProxyDescriptor::new(
            Protocol::Shadowsocks,
            server,
            server_port,
            Identity::Cipher { method, password },
        )?
        .with_remark(remark))
    }
}

type Decoded = (String, String, String, u16);

impl ShadowsocksParser {
    /// Parses `userinfo@host:port[/][?query]`
    fn parse_sip002(&self, main_part: &str, at_pos: usize) -> Result<Decoded> {
        let userinfo = &main_part[..at_pos];
        let hostport_and_query = &main_part[at_pos + 1..];

        let hostport = match hostport_and_query.split_once('?') {
            Some((hostport, query)) => {
                if !query.is_empty() {
                    trace!("Ignoring Shadowsocks query parameters");
                }
                hostport
            }
            None => hostport_and_query,
        };
        let hostport = hostport.trim_end_matches('/');

        let (server, server_port) = parse_host_port(Protocol::Shadowsocks, hostport)?;
        let (method, password) = self.parse_userinfo(userinfo)?;

        Ok((method, password, server, server_port))
    }

    /// Parses legacy format: BASE64(method:password@host:port)
    fn parse_legacy(&self, main_part: &str) -> Result<Decoded> {
        let decoded = decode_base64_text(main_part).ok_or_else(|| {
            ParseError::invalid(
                Protocol::Shadowsocks,
                "payload is not valid Base64 encoded UTF-8",
            )
        })?;

        let (credentials, hostport) = decoded.rsplit_once('@').ok_or_else(|| {
            ParseError::invalid(Protocol::Shadowsocks, "missing @ in decoded payload")
        })?;

        let (method, password) = split_credentials(credentials)?;
        let (server, server_port) = parse_host_port(Protocol::Shadowsocks, hostport)?;

        Ok((method, password, server, server_port))
    }

    /// Decodes userinfo, trying Base64 before plain `method:password`
    fn parse_userinfo(&self, userinfo: &str) -> Result<(String, String)> {
        // Padding is often percent-encoded as %3D
        let userinfo = decode_component(userinfo);
        if let Some(decoded) = decode_base64_text(&userinfo)
            && decoded.contains(':')
        {
            trace!("Decoded Base64 userinfo");
            return split_credentials(&decoded);
        }

        split_credentials(&userinfo)
    }
}

/// Splits `method:password` at the first colon
fn split_credentials(credentials: &str) -> Result<(String, String)> {
    let (method, password) = credentials.split_once(':').ok_or_else(|| {
        ParseError::invalid(Protocol::Shadowsocks, "userinfo must be method:password")
    })?;

    if method.is_empty() {
        return Err(ParseError::invalid(Protocol::Shadowsocks, "missing method"));
    }
    if password.is_empty() {
        return Err(ParseError::invalid(Protocol::Shadowsocks, "missing password"));
    }

    Ok((method.to_string(), password.to_string()))
}
