//! VLESS protocol parser
//!
//! This module provides parsing for VLESS (vless://) URIs.
//! Format: vless://uuid@host:port?params#tag

use std::collections::HashMap;

use tracing::trace;
use url::Url;

use crate::descriptor::{Extra, Identity, Protocol, ProxyDescriptor};
use crate::error::{ParseError, Result};

use super::{
    ProtocolParser, decode_component, non_empty, security_from_params, transport_from_params,
    url_authority,
};

// ============================================================================
// VLESS Parser
// ============================================================================

/// Parser for VLESS (vless://) URIs
///
/// Format: vless://uuid@host:port?params#tag
pub struct VLessParser;

impl ProtocolParser for VLessParser {
    fn scheme(&self) -> &'static str {
        "vless"
    }

    fn protocol(&self) -> Protocol {
        Protocol::VLess
    }

    fn parse(&self, uri: &str) -> Result<ProxyDescriptor> {
        let uri = uri.trim();
        trace!("Parsing VLESS URI");
        self.strip_scheme(uri)?;

        let url = Url::parse(uri)
            .map_err(|e| ParseError::invalid(Protocol::VLess, format!("malformed URI: {e}")))?;

        let uuid = decode_component(url.username());
        if uuid.is_empty() {
            return Err(ParseError::invalid(Protocol::VLess, "missing UUID"));
        }

        let (server, server_port) = url_authority(Protocol::VLess, &url)?;

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        trace!("VLESS query parameters: {:?}", params.keys().collect::<Vec<_>>());

        let remark = url.fragment().map(decode_component).unwrap_or_default();

        let security = security_from_params(Protocol::VLess, &params, "none")?;
        let transport = transport_from_params(Protocol::VLess, &params)?;

        let extra = Extra::VLess {
            flow: non_empty(params.get("flow")),
            encryption: non_empty(params.get("encryption")).unwrap_or_else(|| "none".to_string()),
        };

        Ok(
            ProxyDescriptor::new(Protocol::VLess, server, server_port, Identity::Uuid(uuid))?
                .with_remark(remark)
                .with_transport(transport)
                .with_security(security)
                .with_extra(extra),
        )
    }
}
