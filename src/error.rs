//! Error types for share link parsing and config assembly
//!
//! Every decoder, the scheme dispatcher and the [`ShareLink`](crate::ShareLink)
//! accessor report failures through [`ParseError`].

use thiserror::Error;

use crate::descriptor::Protocol;

/// Share link parsing and assembly errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// The link does not start with one of the supported scheme prefixes
    #[error("Unsupported share link scheme: {0}")]
    UnsupportedScheme(String),

    /// The scheme matched but the link body is malformed
    #[error("Invalid {protocol} link: {reason}")]
    ParseUri {
        /// Protocol whose decoder rejected the link
        protocol: Protocol,
        /// What was wrong with the link
        reason: String,
    },

    /// An outbound tag is defined more than once
    #[error("Outbound tag already defined: {0}")]
    TagConflict(String),

    /// A routing rule targets an outbound tag that does not exist
    #[error("Outbound tag not found: {0}")]
    TagNotFound(String),

    /// Configuration was requested before any link was parsed
    #[error("No share link has been parsed yet")]
    NotYetParsed,

    /// Rendering the engine configuration as JSON failed
    #[error("Failed to serialize engine configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ParseError {
    /// Shorthand for [`ParseError::ParseUri`]
    pub fn invalid(protocol: Protocol, reason: impl Into<String>) -> Self {
        Self::ParseUri {
            protocol,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the library
pub type Result<T, E = ParseError> = std::result::Result<T, E>;
