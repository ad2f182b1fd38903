//! Application-wide constants for habit-push.
//!
//! Centralizes the wire-level numbers of the Web Push path and the
//! operational defaults of the reminder job.
//!
//! # Categories
//!
//! - **Timeouts**: Network timeouts
//! - **Web Push**: RFC 8291 / RFC 8188 / RFC 8292 field widths and headers
//! - **Reminders**: Job defaults

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP client request timeout for push service and store calls.
///
/// Bounds the worst-case latency of a single delivery so one slow push
/// service cannot stall a whole reminder batch.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Web Push
// ============================================================================

/// Lifetime of a VAPID token (12 hours, in seconds).
///
/// RFC 8292 caps `exp` at 24 hours; push services commonly reject tokens
/// close to that limit, so we stay at half of it.
pub const VAPID_TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

/// Default VAPID `sub` claim.
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:notifications@us-better.lovable.app";

/// Default `TTL` header value (24 hours).
pub const DEFAULT_TTL_SECS: u32 = 86_400;

/// `Urgency` header value sent with every push.
pub const PUSH_URGENCY: &str = "normal";

/// `Content-Encoding` for RFC 8188 framed bodies.
pub const CONTENT_ENCODING_AES128GCM: &str = "aes128gcm";

/// Record size advertised in the `aes128gcm` header.
pub const RECORD_SIZE: u32 = 4096;

/// Length of the random salt in the `aes128gcm` header.
pub const SALT_LEN: usize = 16;

/// Length of an uncompressed SEC1 P-256 point (0x04 || x || y).
pub const P256_PUBLIC_KEY_LEN: usize = 65;

/// Length of a raw P-256 private scalar.
pub const P256_PRIVATE_KEY_LEN: usize = 32;

/// Length of the subscriber auth secret.
pub const AUTH_SECRET_LEN: usize = 16;

/// AES-128-GCM content-encryption key length.
pub const CEK_LEN: usize = 16;

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Padding delimiter marking the last (and only) record.
pub const LAST_RECORD_DELIMITER: u8 = 0x02;

/// Fixed header length: salt + record size + key id length + key id.
pub const FRAME_HEADER_LEN: usize = SALT_LEN + 4 + 1 + P256_PUBLIC_KEY_LEN;

/// Largest plaintext that still fits in a single record.
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - TAG_LEN - 1;

// ============================================================================
// Reminders
// ============================================================================

/// Default number of deliveries in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Default listen address for the HTTP trigger.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";

/// Icon shown by the service worker.
pub const NOTIFICATION_ICON: &str = "/icon-192.png";

/// URL the service worker opens when the notification is clicked.
pub const NOTIFICATION_CLICK_URL: &str = "/";

/// Build a User-Agent string for outbound HTTP requests.
pub fn user_agent() -> String {
    format!("habit-push/{}", env!("CARGO_PKG_VERSION"))
}
