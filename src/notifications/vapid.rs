//! VAPID keys and token signing for Web Push (RFC 8292).
//!
//! The application server proves its identity to the push service with a
//! short-lived ES256 JWT. The key pair is loaded once from configuration
//! and handed to [`VapidSigner`] explicitly; nothing here is global.

// Rust guideline compliant 2026-02

use std::sync::Arc;

use anyhow::{Context, Result};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{P256_PRIVATE_KEY_LEN, P256_PUBLIC_KEY_LEN, VAPID_TOKEN_LIFETIME_SECS};
use crate::encoding::{base64url_decode, base64url_encode};

/// VAPID keypair for web push authentication.
///
/// The private key is a P-256 ECDSA signing key; the public key is the
/// uncompressed SEC1 point (65 bytes) that browsers were given as
/// `applicationServerKey` when they subscribed.
#[derive(Clone)]
pub struct VapidKeys {
    signing_key: SigningKey,
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key_b64: String,
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

/// Serialized form of a key pair, as printed by `habit-push keygen`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyExport {
    /// Base64url uncompressed public key (65 bytes decoded).
    pub public_key: String,
    /// Base64url raw private scalar (32 bytes decoded).
    pub private_key: String,
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        // SEC1 uncompressed public key (65 bytes: 0x04 || x || y)
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);
        let public_key_b64 = base64url_encode(public_bytes.as_bytes());
        Self {
            signing_key,
            public_key_b64,
        }
    }

    /// Reconstruct from base64url-encoded strings (configuration).
    ///
    /// The private key is normally the raw 32-byte scalar. SEC1 DER and
    /// PKCS8 DER encodings, as emitted by some key tools, are accepted too
    /// and normalized. The public key must be the point for that scalar.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self> {
        let pub_bytes = base64url_decode(public_key_b64.trim())
            .context("Invalid base64url for VAPID public key")?;
        anyhow::ensure!(
            pub_bytes.len() == P256_PUBLIC_KEY_LEN && pub_bytes[0] == 0x04,
            "VAPID public key must be 65-byte uncompressed P-256 point, got {} bytes",
            pub_bytes.len()
        );

        let priv_bytes = base64url_decode(private_key_b64.trim())
            .context("Invalid base64url for VAPID private key")?;
        let signing_key = Self::parse_private_key(&priv_bytes)?;

        let keys = Self::from_signing_key(signing_key);
        anyhow::ensure!(
            keys.public_key_bytes()? == pub_bytes,
            "VAPID public key does not belong to the configured private key"
        );
        Ok(keys)
    }

    /// Parse a raw scalar, falling back to SEC1 DER then PKCS8 DER.
    fn parse_private_key(bytes: &[u8]) -> Result<SigningKey> {
        if bytes.len() == P256_PRIVATE_KEY_LEN {
            return SigningKey::from_slice(bytes)
                .context("VAPID private key is not a valid P-256 scalar");
        }

        if let Ok(sk) = p256::SecretKey::from_sec1_der(bytes) {
            log::info!("[WebPush] VAPID private key given as SEC1 DER ({} bytes)", bytes.len());
            return Ok(SigningKey::from(sk));
        }

        use p256::pkcs8::DecodePrivateKey;
        let sk = SigningKey::from_pkcs8_der(bytes)
            .context("VAPID private key is not valid 32-byte scalar, SEC1 DER, or PKCS8 DER")?;
        log::info!("[WebPush] VAPID private key given as PKCS8 DER ({} bytes)", bytes.len());
        Ok(sk)
    }

    /// Base64url-encoded uncompressed public key (65 bytes decoded).
    ///
    /// This is the `k=` parameter of the `Authorization` header.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded raw 32-byte private key scalar.
    pub fn private_key_base64url(&self) -> String {
        base64url_encode(self.signing_key.to_bytes().as_slice())
    }

    /// Uncompressed public key bytes (65 bytes).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        base64url_decode(&self.public_key_b64).context("Failed to decode VAPID public key")
    }

    /// Export both halves for printing or storage.
    pub fn export(&self) -> VapidKeyExport {
        VapidKeyExport {
            public_key: self.public_key_b64.clone(),
            private_key: self.private_key_base64url(),
        }
    }
}

/// JWS header. Always ES256.
#[derive(Debug, Serialize)]
struct JwtHeader {
    typ: &'static str,
    alg: &'static str,
}

const JWT_HEADER: JwtHeader = JwtHeader {
    typ: "JWT",
    alg: "ES256",
};

/// Claims carried by a VAPID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapidClaims {
    /// Origin of the push endpoint (`scheme://host[:port]`).
    pub aud: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Contact URI of the sender.
    pub sub: String,
}

/// A signed compact JWT, valid for exactly one audience.
#[derive(Debug, Clone)]
pub struct VapidToken {
    token: String,
    claims: VapidClaims,
}

impl VapidToken {
    /// The compact `header.claims.signature` form.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Claims that were signed.
    pub fn claims(&self) -> &VapidClaims {
        &self.claims
    }
}

/// Signs VAPID tokens with an immutable key pair.
///
/// Every call builds a new token for the endpoint's audience; tokens are
/// not cached, so one can never leak across push services.
#[derive(Debug, Clone)]
pub struct VapidSigner {
    keys: Arc<VapidKeys>,
    subject: String,
}

impl VapidSigner {
    /// Create a signer. `subject` must be a `mailto:` or `https:` URI.
    pub fn new(keys: Arc<VapidKeys>, subject: impl Into<String>) -> Result<Self> {
        let subject = subject.into();
        anyhow::ensure!(
            subject.starts_with("mailto:") || subject.starts_with("https:"),
            "VAPID subject must be a mailto: or https: URI, got {subject:?}"
        );
        Ok(Self { keys, subject })
    }

    /// Key pair used for signing.
    pub fn keys(&self) -> &VapidKeys {
        &self.keys
    }

    /// Sign a token for `endpoint`, expiring 12 hours from now.
    pub fn sign(&self, endpoint: &str) -> Result<VapidToken> {
        self.sign_at(endpoint, chrono::Utc::now().timestamp())
    }

    /// Sign a token for `endpoint` as if the current time were `now`.
    pub fn sign_at(&self, endpoint: &str, now: i64) -> Result<VapidToken> {
        let claims = VapidClaims {
            aud: audience_for(endpoint)?,
            exp: now + VAPID_TOKEN_LIFETIME_SECS,
            sub: self.subject.clone(),
        };

        let header_b64 = base64url_encode(serde_json::to_vec(&JWT_HEADER)?);
        let claims_b64 = base64url_encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        // p256 signatures serialize as fixed-width r || s (64 bytes), the JWS
        // form. Never DER.
        let signature: Signature = self.keys.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = base64url_encode(signature.to_bytes());

        Ok(VapidToken {
            token: format!("{signing_input}.{signature_b64}"),
            claims,
        })
    }

    /// `Authorization` header value for a token: `vapid t=<jwt>, k=<key>`.
    pub fn authorization_header(&self, token: &VapidToken) -> String {
        format!(
            "vapid t={}, k={}",
            token.as_str(),
            self.keys.public_key_base64url()
        )
    }
}

/// Origin of a push endpoint, used as the VAPID `aud` claim.
///
/// Default ports are dropped and non-default ports kept, matching how
/// push services compute the origin they compare against.
pub fn audience_for(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).with_context(|| format!("Invalid push endpoint URL: {endpoint}"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "https" | "http"),
        "Push endpoint must be http(s), got scheme {:?}",
        url.scheme()
    );
    anyhow::ensure!(url.host_str().is_some(), "Push endpoint has no host: {endpoint}");
    Ok(url.origin().ascii_serialization())
}
