//! `aes128gcm` content-coding header (RFC 8188 §2.1).
//!
//! ```text
//! +-----------+--------+-----------+---------------+------------+
//! | salt (16) | rs (4) | idlen (1) | keyid (idlen) | ciphertext |
//! +-----------+--------+-----------+---------------+------------+
//! ```
//!
//! For Web Push the key id is always the 65-byte ephemeral public key and
//! the body is a single record, so `rs` is fixed at 4096.

use anyhow::Result;

use crate::constants::{FRAME_HEADER_LEN, P256_PUBLIC_KEY_LEN, RECORD_SIZE, SALT_LEN};
use crate::encoding::concat;

/// Header fields and ciphertext of a parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// Salt used for key derivation.
    pub salt: [u8; SALT_LEN],
    /// Advertised record size.
    pub record_size: u32,
    /// Sender's ephemeral public key.
    pub key_id: &'a [u8],
    /// Ciphertext including the GCM tag.
    pub ciphertext: &'a [u8],
}

/// Assemble the `aes128gcm` body: `salt || rs || idlen || keyid || ciphertext`.
pub fn build_frame(
    salt: &[u8; SALT_LEN],
    ephemeral_public_key: &[u8; P256_PUBLIC_KEY_LEN],
    ciphertext: &[u8],
) -> Vec<u8> {
    let record_size = RECORD_SIZE.to_be_bytes();
    let key_id_len = [P256_PUBLIC_KEY_LEN as u8];
    concat(&[
        salt.as_slice(),
        record_size.as_slice(),
        key_id_len.as_slice(),
        ephemeral_public_key.as_slice(),
        ciphertext,
    ])
}

/// Split a frame into header fields and ciphertext.
///
/// Only the Web Push shape is accepted: a 65-byte key id and a
/// non-empty ciphertext.
pub fn parse_frame(frame: &[u8]) -> Result<ParsedFrame<'_>> {
    anyhow::ensure!(
        frame.len() > FRAME_HEADER_LEN,
        "Frame too short: {} bytes, header alone is {}",
        frame.len(),
        FRAME_HEADER_LEN
    );

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&frame[..SALT_LEN]);

    let mut rs = [0u8; 4];
    rs.copy_from_slice(&frame[SALT_LEN..SALT_LEN + 4]);
    let record_size = u32::from_be_bytes(rs);

    let key_id_len = usize::from(frame[SALT_LEN + 4]);
    anyhow::ensure!(
        key_id_len == P256_PUBLIC_KEY_LEN,
        "Unexpected key id length {key_id_len}, Web Push uses {P256_PUBLIC_KEY_LEN}"
    );

    let key_id_start = SALT_LEN + 5;
    Ok(ParsedFrame {
        salt,
        record_size,
        key_id: &frame[key_id_start..FRAME_HEADER_LEN],
        ciphertext: &frame[FRAME_HEADER_LEN..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let salt = [0xAA; 16];
        let mut key = [0x11; 65];
        key[0] = 0x04;
        let ciphertext = vec![0x5A; 37];

        let frame = build_frame(&salt, &key, &ciphertext);

        assert_eq!(frame.len(), 16 + 4 + 1 + 65 + 37);
        assert_eq!(&frame[0..16], &salt);
        assert_eq!(&frame[16..20], &[0x00u8, 0x00, 0x10, 0x00]);
        assert_eq!(u32::from_be_bytes(frame[16..20].try_into().unwrap()), 4096);
        assert_eq!(frame[20], 65);
        assert_eq!(&frame[21..86], &key);
        assert_eq!(&frame[86..], ciphertext.as_slice());
    }

    #[test]
    fn test_parse_inverts_build() {
        let salt = [7u8; 16];
        let key = [4u8; 65];
        let frame = build_frame(&salt, &key, b"ciphertext");

        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.salt, salt);
        assert_eq!(parsed.record_size, 4096);
        assert_eq!(parsed.key_id, key.as_slice());
        assert_eq!(parsed.ciphertext, b"ciphertext");
    }

    #[test]
    fn test_parse_rejects_short_frame() {
        assert!(parse_frame(&[0u8; 86]).is_err());
        assert!(parse_frame(&[]).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_key_id_length() {
        let mut frame = build_frame(&[0u8; 16], &[4u8; 65], b"x");
        frame[20] = 32;
        assert!(parse_frame(&frame).is_err());
    }
}
