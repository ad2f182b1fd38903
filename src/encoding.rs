//! Base64url and byte helpers shared by the Web Push path.
//!
//! Web Push carries every key and token as unpadded base64url. Browsers
//! are not consistent about padding in `PushSubscription.toJSON()`, so
//! decoding accepts both forms while encoding never pads.

use anyhow::{Context, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// URL-safe decoder that accepts input with or without `=` padding.
///
/// Still strict about the alphabet: `+`, `/`, whitespace and any other
/// character outside `A-Z a-z 0-9 - _` is an error.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, with or without padding.
///
/// Fails on characters outside the URL-safe alphabet and on lengths that
/// cannot come from an encoder.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(input)
        .with_context(|| format!("Invalid base64url input ({} chars)", input.len()))
}

/// Concatenate byte slices into one contiguous buffer, preserving order.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}
