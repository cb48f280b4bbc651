//! Configuration validation module.
//!
//! Catches tag mistakes before the document is handed to the engine:
//! - Outbound tag uniqueness
//! - Routing rules reference existing outbounds (or the API tag)
//! - Routing rules reference existing inbound tags

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{ParseError, Result};

// ============================================================================
// Validation Implementation
// ============================================================================

impl EngineConfig {
    /// Validate tag references, failing on the first problem found.
    ///
    /// # Errors
    ///
    /// [`ParseError::TagConflict`] for a duplicated outbound tag,
    /// [`ParseError::TagNotFound`] for a rule naming an unknown tag.
    pub fn validate(&self) -> Result<()> {
        debug!("starting configuration validation");

        let result = self
            .collect_outbound_tags()
            .and_then(|outbound_tags| self.check_routing_refs(&outbound_tags));

        match &result {
            Ok(()) => debug!("configuration validation passed"),
            Err(e) => warn!(error = %e, "configuration validation failed"),
        }
        result
    }

    /// Collect all outbound tags and check for duplicates.
    fn collect_outbound_tags(&self) -> Result<HashSet<&str>> {
        let mut tags = HashSet::new();

        for outbound in &self.outbounds {
            if !tags.insert(outbound.tag.as_str()) {
                return Err(ParseError::TagConflict(outbound.tag.clone()));
            }
        }

        debug!(count = tags.len(), "collected outbound tags");
        Ok(tags)
    }

    /// Check that every rule targets a known outbound and matches known inbounds.
    fn check_routing_refs(&self, outbound_tags: &HashSet<&str>) -> Result<()> {
        let api_tag = self.api.as_ref().map(|api| api.tag.as_str());
        let inbound_tags: HashSet<&str> = self.inbounds.iter().map(|i| i.tag.as_str()).collect();

        for rule in &self.routing.rules {
            let target = rule.outbound_tag.as_str();
            if !outbound_tags.contains(target) && api_tag != Some(target) {
                return Err(ParseError::TagNotFound(rule.outbound_tag.clone()));
            }

            if let Some(missing) = rule
                .inbound_tag
                .iter()
                .find(|tag| !inbound_tags.contains(tag.as_str()))
            {
                return Err(ParseError::TagNotFound(missing.clone()));
            }
        }

        Ok(())
    }
}
