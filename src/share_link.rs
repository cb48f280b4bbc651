//! Stateful share link accessor
//!
//! [`ShareLink`] keeps the last successfully parsed descriptor and exposes it
//! together with the engine configuration assembled from it. The document is
//! assembled on first access and cached until the next successful parse.

use std::cell::OnceCell;

use tracing::debug;

use crate::assembler::{ConfigAssembler, PROXY_TAG};
use crate::config::outbound::Outbound;
use crate::config::{EngineConfig, to_json_with_indent};
use crate::descriptor::ProxyDescriptor;
use crate::error::{ParseError, Result};
use crate::parser;
use crate::settings::Settings;

/// Descriptor plus its lazily assembled document
#[derive(Debug)]
struct ParsedLink {
    descriptor: ProxyDescriptor,
    config: OnceCell<EngineConfig>,
}

/// Parser instance holding the last successfully parsed link.
///
/// A failed [`parse`](ShareLink::parse) leaves the previous state untouched.
/// `ShareLink` is `Send` but not `Sync`; share it across threads behind a
/// `Mutex`.
#[derive(Debug, Default)]
pub struct ShareLink {
    assembler: ConfigAssembler,
    parsed: Option<ParsedLink>,
}

impl ShareLink {
    /// Create an empty instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty instance assembling with `settings`
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            assembler: ConfigAssembler::new(settings),
            parsed: None,
        }
    }

    /// Parse `uri`, replacing the current link on success
    pub fn parse(&mut self, uri: &str) -> Result<()> {
        let descriptor = parser::parse(uri)?;
        self.set_descriptor(descriptor);
        Ok(())
    }

    /// Replace the current link with an already decoded descriptor
    pub fn set_descriptor(&mut self, descriptor: ProxyDescriptor) {
        debug!(
            "Replacing current link with {} {}:{} ({:?})",
            descriptor.protocol(),
            descriptor.address(),
            descriptor.port(),
            descriptor.address_kind()
        );
        self.parsed = Some(ParsedLink {
            descriptor,
            config: OnceCell::new(),
        });
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn descriptor(&self) -> Option<&ProxyDescriptor> {
        self.parsed.as_ref().map(|parsed| &parsed.descriptor)
    }

    /// Server address, empty before the first successful parse
    pub fn address(&self) -> &str {
        self.descriptor().map_or("", |d| d.address())
    }

    /// Server port, `0` before the first successful parse
    pub fn port(&self) -> u16 {
        self.descriptor().map_or(0, |d| d.port())
    }

    /// Remark, empty before the first successful parse
    pub fn remark(&self) -> &str {
        self.descriptor().map_or("", |d| d.remark())
    }

    /// The full engine document for the current link
    pub fn full_configuration(&self) -> Option<&EngineConfig> {
        let parsed = self.parsed.as_ref()?;
        Some(
            parsed
                .config
                .get_or_init(|| self.assembler.assemble(&parsed.descriptor)),
        )
    }

    /// The `proxy` outbound of the current document
    pub fn outbound(&self) -> Option<&Outbound> {
        self.full_configuration()?.outbound(PROXY_TAG)
    }

    /// Render the full document.
    ///
    /// # Errors
    ///
    /// [`ParseError::NotYetParsed`] before the first successful parse.
    pub fn json(&self, indent: usize) -> Result<String> {
        self.full_configuration()
            .ok_or(ParseError::NotYetParsed)?
            .to_json(indent)
    }

    /// Render only the `proxy` outbound
    pub fn outbound_json(&self, indent: usize) -> Result<String> {
        let outbound = self.outbound().ok_or(ParseError::NotYetParsed)?;
        to_json_with_indent(outbound, indent)
    }
}
