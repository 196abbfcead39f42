//! Encoding utilities for hex and helpers used across the codebase.

use crate::foundation::{AmbassadorError, Hash32};

/// Decodes hex to a byte vector.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, AmbassadorError> {
    hex::decode(s).map_err(|e| e.into())
}

/// Parses a 32-byte hex value, with or without a `0x` prefix.
pub fn parse_hex_32bytes(s: &str) -> Result<Hash32, AmbassadorError> {
    let trimmed = s.trim();
    let unprefixed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = decode_hex(unprefixed)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| AmbassadorError::EncodingError(format!("hex length mismatch: expected 32 bytes, got {}", len)))
}

/// Short hex for logs (first 8 chars).
pub fn encode_hex_short(bytes: &[u8]) -> String {
    let full = hex::encode(bytes);
    if full.len() > 8 {
        format!("{}...", &full[..8])
    } else {
        full
    }
}
