//! Base64 decoding for share link payloads
//!
//! Share links frequently drop the trailing `=` padding, so every decode goes
//! through [`normalize_padding`] first. The standard alphabet is tried before
//! the URL-safe one.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use tracing::trace;

// ============================================================================
// Padding Normalization
// ============================================================================

/// Strips whitespace and appends `=` until the length is a multiple of 4
pub fn normalize_padding(s: &str) -> String {
    let mut result: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a base64 payload after padding normalization.
///
/// Returns `None` when neither the standard nor the URL-safe alphabet accepts
/// the input.
pub fn decode_base64(content: &str) -> Option<Vec<u8>> {
    let padded = normalize_padding(content);
    trace!("Attempting Base64 decode, padded length: {} bytes", padded.len());

    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64");
        return Some(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64");
        return Some(decoded);
    }

    None
}

/// Decodes a base64 payload into UTF-8 text
pub fn decode_base64_text(content: &str) -> Option<String> {
    decode_base64(content).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Encodes bytes with the standard alphabet and padding
pub fn encode_base64(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_padding_none_needed() {
        assert_eq!(normalize_padding("abcd"), "abcd");
        assert_eq!(normalize_padding("abcdabcd"), "abcdabcd");
    }

    #[test]
    fn test_normalize_padding_adds_equals() {
        assert_eq!(normalize_padding("abc"), "abc=");
        assert_eq!(normalize_padding("ab"), "ab==");
        assert_eq!(normalize_padding("a"), "a===");
        assert_eq!(normalize_padding(""), "");
    }

    #[test]
    fn test_normalize_padding_strips_whitespace() {
        assert_eq!(normalize_padding(" ab\ncd\t"), "abcd");
    }

    #[test]
    fn test_decode_standard() {
        let decoded = decode_base64_text("aGVsbG8gd29ybGQ=").unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn test_decode_without_padding() {
        let decoded = decode_base64_text("aGVsbG8gd29ybGQ").unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn test_decode_url_safe() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode_base64("not-valid-base64!!").is_none());
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        // 0xff 0xfe is not valid UTF-8
        assert!(decode_base64_text("//4=").is_none());
    }

    #[test]
    fn test_encode_decode_share_link_payload() {
        let encoded = encode_base64("aes-256-gcm:password");
        assert_eq!(encoded, "YWVzLTI1Ni1nY206cGFzc3dvcmQ=");
        assert_eq!(
            decode_base64_text(encoded.trim_end_matches('=')).unwrap(),
            "aes-256-gcm:password"
        );
    }
}
