//! Web Push message encryption (RFC 8291) over `aes128gcm` (RFC 8188).
//!
//! Each message gets its own ephemeral P-256 key and random salt, so the
//! derived content-encryption key and nonce are never reused. Derived key
//! material lives in [`ContentKeys`] and is zeroized on drop.
//!
//! # Key schedule
//!
//! ```text
//! ecdh_secret = ECDH(as_private, ua_public)
//! IKM   = HKDF(salt=auth_secret, ikm=ecdh_secret,
//!              info="WebPush: info\0" || ua_public || as_public, L=32)
//! CEK   = HKDF(salt=salt, ikm=IKM, info="Content-Encoding: aes128gcm\0", L=16)
//! NONCE = HKDF(salt=salt, ikm=IKM, info="Content-Encoding: nonce\0",    L=12)
//! ```
//!
//! The receiving side ([`decrypt_frame`]) runs the same schedule with the
//! roles swapped. It exists to verify frames end to end.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use anyhow::{Context, Result};
use hkdf::Hkdf;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{
    AUTH_SECRET_LEN, CEK_LEN, LAST_RECORD_DELIMITER, MAX_PLAINTEXT_LEN, NONCE_LEN,
    P256_PRIVATE_KEY_LEN, P256_PUBLIC_KEY_LEN, RECORD_SIZE, SALT_LEN, TAG_LEN,
};
use crate::encoding::{base64url_decode, base64url_encode, concat};
use crate::notifications::frame::{build_frame, parse_frame};

const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Output of [`encrypt`]: everything the frame builder needs.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// AES-128-GCM ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
    /// Random salt used for CEK and nonce derivation.
    pub salt: [u8; SALT_LEN],
    /// Sender's ephemeral public key (uncompressed point).
    pub ephemeral_public_key: [u8; P256_PUBLIC_KEY_LEN],
}

impl EncryptedPayload {
    /// Serialize as an `aes128gcm` body.
    pub fn to_frame(&self) -> Vec<u8> {
        build_frame(&self.salt, &self.ephemeral_public_key, &self.ciphertext)
    }
}

/// Per-message content-encryption key and nonce.
#[derive(Zeroize, ZeroizeOnDrop)]
struct ContentKeys {
    cek: [u8; CEK_LEN],
    nonce: [u8; NONCE_LEN],
}

/// HKDF-SHA256 key derivation function
fn kdf(input_key: &[u8], salt: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key);
    let mut output = vec![0u8; length];
    hk.expand(info, &mut output)
        .map_err(|e| anyhow::anyhow!("HKDF expansion failed: {}", e))?;
    Ok(output)
}

/// Run the RFC 8291 key schedule.
fn derive_content_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<ContentKeys> {
    let key_info = concat(&[KEY_INFO_PREFIX, ua_public, as_public]);
    let mut ikm = kdf(ecdh_secret, auth_secret, &key_info, 32)?;

    let mut cek_bytes = kdf(&ikm, salt, CEK_INFO, CEK_LEN)?;
    let mut nonce_bytes = kdf(&ikm, salt, NONCE_INFO, NONCE_LEN)?;
    ikm.zeroize();

    let mut keys = ContentKeys {
        cek: [0u8; CEK_LEN],
        nonce: [0u8; NONCE_LEN],
    };
    keys.cek.copy_from_slice(&cek_bytes);
    keys.nonce.copy_from_slice(&nonce_bytes);
    cek_bytes.zeroize();
    nonce_bytes.zeroize();
    Ok(keys)
}

/// Decode and validate a subscriber's `p256dh` key.
fn decode_subscriber_key(p256dh: &str) -> Result<(Vec<u8>, PublicKey)> {
    let bytes = base64url_decode(p256dh).context("Invalid base64url for subscriber p256dh")?;
    anyhow::ensure!(
        bytes.len() == P256_PUBLIC_KEY_LEN && bytes[0] == 0x04,
        "Subscriber p256dh must be a 65-byte uncompressed P-256 point, got {} bytes",
        bytes.len()
    );
    let key = PublicKey::from_sec1_bytes(&bytes).context("Subscriber p256dh is not on P-256")?;
    Ok((bytes, key))
}

/// Decode and validate a subscriber's `auth` secret.
fn decode_auth_secret(auth: &str) -> Result<Vec<u8>> {
    let bytes = base64url_decode(auth).context("Invalid base64url for subscriber auth")?;
    anyhow::ensure!(
        bytes.len() == AUTH_SECRET_LEN,
        "Subscriber auth secret must be {AUTH_SECRET_LEN} bytes, got {}",
        bytes.len()
    );
    Ok(bytes)
}

fn uncompressed_point(key: &PublicKey) -> Result<[u8; P256_PUBLIC_KEY_LEN]> {
    let encoded = key.to_encoded_point(false);
    encoded
        .as_bytes()
        .try_into()
        .context("Encoded P-256 point has unexpected length")
}

/// Encrypt `payload` for one subscriber.
///
/// `p256dh` and `auth` are the base64url strings from the browser's
/// `PushSubscription`. Fails if the payload does not fit in one record or
/// the subscriber keys are malformed.
pub fn encrypt(payload: &[u8], p256dh: &str, auth: &str) -> Result<EncryptedPayload> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    encrypt_with(payload, p256dh, auth, &ephemeral, salt)
}

fn encrypt_with(
    payload: &[u8],
    p256dh: &str,
    auth: &str,
    ephemeral: &SecretKey,
    salt: [u8; SALT_LEN],
) -> Result<EncryptedPayload> {
    anyhow::ensure!(
        payload.len() <= MAX_PLAINTEXT_LEN,
        "Payload of {} bytes exceeds the single-record limit of {MAX_PLAINTEXT_LEN}",
        payload.len()
    );

    let (ua_public_bytes, ua_public) = decode_subscriber_key(p256dh)?;
    let auth_secret = decode_auth_secret(auth)?;

    let as_public = uncompressed_point(&ephemeral.public_key())?;
    let shared = p256::ecdh::diffie_hellman(ephemeral.to_nonzero_scalar(), ua_public.as_affine());

    let keys = derive_content_keys(
        shared.raw_secret_bytes().as_slice(),
        &auth_secret,
        &ua_public_bytes,
        &as_public,
        &salt,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&keys.cek)
        .map_err(|e| anyhow::anyhow!("Invalid content-encryption key: {e}"))?;

    let mut padded = concat(&[payload, std::slice::from_ref(&LAST_RECORD_DELIMITER)]);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&keys.nonce), padded.as_slice())
        .map_err(|e| anyhow::anyhow!("Encryption failed: {e}"));
    padded.zeroize();

    Ok(EncryptedPayload {
        ciphertext: ciphertext?,
        salt,
        ephemeral_public_key: as_public,
    })
}

/// Decrypt an `aes128gcm` Web Push body as the user agent would.
///
/// `ua_private_key` is the subscriber's raw 32-byte P-256 scalar and
/// `auth_secret` the 16-byte secret it shared at subscription time.
pub fn decrypt_frame(frame: &[u8], ua_private_key: &[u8], auth_secret: &[u8]) -> Result<Vec<u8>> {
    anyhow::ensure!(
        ua_private_key.len() == P256_PRIVATE_KEY_LEN,
        "Subscriber private key must be {P256_PRIVATE_KEY_LEN} bytes"
    );
    anyhow::ensure!(
        auth_secret.len() == AUTH_SECRET_LEN,
        "Auth secret must be {AUTH_SECRET_LEN} bytes"
    );

    let parsed = parse_frame(frame)?;
    anyhow::ensure!(
        parsed.ciphertext.len() <= RECORD_SIZE as usize,
        "Multi-record bodies are not supported"
    );
    anyhow::ensure!(
        parsed.ciphertext.len() > TAG_LEN,
        "Ciphertext shorter than the GCM tag"
    );

    let ua_secret = SecretKey::from_slice(ua_private_key).context("Invalid subscriber private key")?;
    let ua_public = uncompressed_point(&ua_secret.public_key())?;
    let as_public =
        PublicKey::from_sec1_bytes(parsed.key_id).context("Frame key id is not a P-256 point")?;

    let shared = p256::ecdh::diffie_hellman(ua_secret.to_nonzero_scalar(), as_public.as_affine());
    let keys = derive_content_keys(
        shared.raw_secret_bytes().as_slice(),
        auth_secret,
        &ua_public,
        parsed.key_id,
        &parsed.salt,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&keys.cek)
        .map_err(|e| anyhow::anyhow!("Invalid content-encryption key: {e}"))?;
    let mut padded = cipher
        .decrypt(Nonce::from_slice(&keys.nonce), parsed.ciphertext)
        .map_err(|e| anyhow::anyhow!("Decryption failed: {e}"))?;

    // Strip trailing zero padding, then the delimiter itself.
    let delimiter_at = padded
        .iter()
        .rposition(|&b| b != 0)
        .context("Record contains no padding delimiter")?;
    anyhow::ensure!(
        padded[delimiter_at] == LAST_RECORD_DELIMITER,
        "Expected last-record delimiter 0x02, found {:#04x}",
        padded[delimiter_at]
    );
    padded.truncate(delimiter_at);
    Ok(padded)
}

/// Browser-side key material for a push subscription.
///
/// Mirrors what a user agent generates when it subscribes. Used to
/// exercise the encryptor against [`decrypt_frame`] without a browser.
#[derive(Debug, Clone)]
pub struct SubscriberKeys {
    secret: SecretKey,
    auth: [u8; AUTH_SECRET_LEN],
}

impl SubscriberKeys {
    /// Generate a fresh subscriber key pair and auth secret.
    pub fn generate() -> Self {
        let mut auth = [0u8; AUTH_SECRET_LEN];
        rand::rng().fill_bytes(&mut auth);
        Self {
            secret: SecretKey::random(&mut OsRng),
            auth,
        }
    }

    /// `p256dh` as it would appear in `PushSubscription.toJSON()`.
    pub fn p256dh(&self) -> String {
        base64url_encode(self.secret.public_key().to_encoded_point(false).as_bytes())
    }

    /// `auth` as it would appear in `PushSubscription.toJSON()`.
    pub fn auth(&self) -> String {
        base64url_encode(self.auth)
    }

    /// Decrypt a frame addressed to this subscriber.
    pub fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>> {
        decrypt_frame(frame, self.secret.to_bytes().as_slice(), &self.auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let subscriber = SubscriberKeys::generate();
        let payload = br#"{"title":"hi","body":"there"}"#;

        let encrypted = encrypt(payload, &subscriber.p256dh(), &subscriber.auth()).unwrap();
        assert_eq!(encrypted.ciphertext.len(), payload.len() + 1 + TAG_LEN);

        let decrypted = subscriber.decrypt(&encrypted.to_frame()).unwrap();
        assert_eq!(decrypted, payload);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let subscriber = SubscriberKeys::generate();
        let encrypted = encrypt(b"", &subscriber.p256dh(), &subscriber.auth()).unwrap();
        assert_eq!(encrypted.ciphertext.len(), 1 + TAG_LEN);
        assert!(subscriber.decrypt(&encrypted.to_frame()).unwrap().is_empty());
    }

    #[test]
    fn test_each_message_uses_fresh_salt_and_key() {
        let subscriber = SubscriberKeys::generate();
        let a = encrypt(b"same", &subscriber.p256dh(), &subscriber.auth()).unwrap();
        let b = encrypt(b"same", &subscriber.p256dh(), &subscriber.auth()).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ephemeral_public_key, b.ephemeral_public_key);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_fixed_inputs_are_deterministic() {
        // Same ephemeral key and salt must yield the same bytes; the
        // randomness lives entirely in `encrypt`.
        let subscriber = SubscriberKeys::generate();
        let ephemeral = SecretKey::random(&mut OsRng);
        let salt = [9u8; SALT_LEN];

        let a = encrypt_with(b"x", &subscriber.p256dh(), &subscriber.auth(), &ephemeral, salt)
            .unwrap();
        let b = encrypt_with(b"x", &subscriber.p256dh(), &subscriber.auth(), &ephemeral, salt)
            .unwrap();
        assert_eq!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_matches_independent_key_schedule() {
        // Re-derive CEK and nonce step by step from RFC 8291 §3.4 and
        // decrypt with them directly.
        let subscriber = SubscriberKeys::generate();
        let ephemeral = SecretKey::random(&mut OsRng);
        let salt = [3u8; SALT_LEN];
        let encrypted = encrypt_with(
            b"watermelon",
            &subscriber.p256dh(),
            &subscriber.auth(),
            &ephemeral,
            salt,
        )
        .unwrap();

        let ua_public = base64url_decode(&subscriber.p256dh()).unwrap();
        let shared = p256::ecdh::diffie_hellman(
            ephemeral.to_nonzero_scalar(),
            PublicKey::from_sec1_bytes(&ua_public).unwrap().as_affine(),
        );

        let mut info = b"WebPush: info\x00".to_vec();
        info.extend_from_slice(&ua_public);
        info.extend_from_slice(&encrypted.ephemeral_public_key);
        let mut ikm = [0u8; 32];
        Hkdf::<Sha256>::new(Some(subscriber.auth.as_slice()), shared.raw_secret_bytes().as_slice())
            .expand(&info, &mut ikm)
            .unwrap();

        let prk = Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm);
        let mut cek = [0u8; 16];
        prk.expand(b"Content-Encoding: aes128gcm\x00", &mut cek).unwrap();
        let mut nonce = [0u8; 12];
        prk.expand(b"Content-Encoding: nonce\x00", &mut nonce).unwrap();

        let plain = Aes128Gcm::new_from_slice(&cek)
            .unwrap()
            .decrypt(Nonce::from_slice(&nonce), encrypted.ciphertext.as_slice())
            .unwrap();
        assert_eq!(plain, b"watermelon\x02");
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let subscriber = SubscriberKeys::generate();
        let payload = vec![b'a'; MAX_PLAINTEXT_LEN + 1];
        assert!(encrypt(&payload, &subscriber.p256dh(), &subscriber.auth()).is_err());

        let payload = vec![b'a'; MAX_PLAINTEXT_LEN];
        let encrypted = encrypt(&payload, &subscriber.p256dh(), &subscriber.auth()).unwrap();
        assert_eq!(encrypted.ciphertext.len(), RECORD_SIZE as usize);
    }

    #[test]
    fn test_rejects_bad_subscriber_keys() {
        let subscriber = SubscriberKeys::generate();
        // Wrong length auth
        assert!(encrypt(b"x", &subscriber.p256dh(), "AAAA").is_err());
        // Not a point on the curve
        let bogus = base64url_encode([0x04; 65]);
        assert!(encrypt(b"x", &bogus, &subscriber.auth()).is_err());
        // Compressed points are not what browsers send
        let compressed = base64url_encode(
            subscriber.secret.public_key().to_encoded_point(true).as_bytes(),
        );
        assert!(encrypt(b"x", &compressed, &subscriber.auth()).is_err());
    }

    #[test]
    fn test_wrong_subscriber_cannot_decrypt() {
        let alice = SubscriberKeys::generate();
        let mallory = SubscriberKeys::generate();
        let frame = encrypt(b"secret", &alice.p256dh(), &alice.auth())
            .unwrap()
            .to_frame();
        assert!(mallory.decrypt(&frame).is_err());
    }

    #[test]
    fn test_tampered_frame_fails() {
        let subscriber = SubscriberKeys::generate();
        let mut frame = encrypt(b"secret", &subscriber.p256dh(), &subscriber.auth())
            .unwrap()
            .to_frame();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(subscriber.decrypt(&frame).is_err());
    }
}
