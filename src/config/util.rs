//! Utility functions for serde serialization.
//!
//! This module contains helper functions commonly used with serde's
//! `skip_serializing_if` attribute.

// ============================================================================
// Boolean Helpers
// ============================================================================

/// Returns `true` if the boolean value is `false`.
///
/// Used with `#[serde(skip_serializing_if = "is_false")]` to omit false values.
#[inline]
pub fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// Tests
// ============================================================================
