//! Trojan protocol parser
//!
//! This module provides parsing for Trojan (trojan://) URIs.
//! Format: trojan://password@host:port?params#tag

use std::collections::HashMap;

use tracing::trace;
use url::Url;

use crate::descriptor::{Identity, Protocol, ProxyDescriptor};
use crate::error::{ParseError, Result};

use super::{
    ProtocolParser, decode_component, security_from_params, transport_from_params, url_authority,
};

// ============================================================================
// Trojan Parser
// ============================================================================

/// Parser for Trojan (trojan://) URIs
///
/// Format: trojan://password@host:port?params#tag
pub struct TrojanParser;

impl ProtocolParser for TrojanParser {
    fn scheme(&self) -> &'static str {
        "trojan"
    }

    fn protocol(&self) -> Protocol {
        Protocol::Trojan
    }

    fn parse(&self, uri: &str) -> Result<ProxyDescriptor> {
        let uri = uri.trim();
        trace!("Parsing Trojan URI");
        self.strip_scheme(uri)?;

        let url = Url::parse(uri)
            .map_err(|e| ParseError::invalid(Protocol::Trojan, format!("malformed URI: {e}")))?;

        // `url` splits userinfo at the first ':', which is part of the password here
        let password = match url.password() {
            Some(rest) => decode_component(&format!("{}:{rest}", url.username())),
            None => decode_component(url.username()),
        };
        if password.is_empty() {
            return Err(ParseError::invalid(Protocol::Trojan, "missing password"));
        }

        let (server, server_port) = url_authority(Protocol::Trojan, &url)?;

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let remark = url.fragment().map(decode_component).unwrap_or_default();

        // Trojan runs over TLS unless the link opts out
        let security = security_from_params(Protocol::Trojan, &params, "tls")?;
        let transport = transport_from_params(Protocol::Trojan, &params)?;

        Ok(ProxyDescriptor::new(
            Protocol::Trojan,
            server,
            server_port,
            Identity::Password(password),
        )?
        .with_remark(remark)
        .with_transport(transport)
        .with_security(security))
    }
}
