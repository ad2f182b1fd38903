//! Web push notification infrastructure.
//!
//! Signs, encrypts and delivers push messages directly to browser push
//! services. No high-level push library is involved; every byte on the
//! wire is built here.
//!
//! # Architecture
//!
//! ```text
//! Reminder job picks a subscription + payload
//!     ↓
//! vapid::VapidSigner    → ES256 JWT for the endpoint origin (RFC 8292)
//! ece::encrypt          → ECDH + HKDF + AES-128-GCM (RFC 8291)
//! frame::build_frame    → salt || rs || idlen || keyid || ciphertext (RFC 8188)
//!     ↓
//! push::PushDispatcher  → HTTP POST, status → DeliveryResult
//!     ↓
//! Push service delivers to the service worker
//! ```
//!
//! # VAPID Keys
//!
//! One P-256 key pair per deployment, loaded from configuration at
//! startup. Browsers subscribed with its public half as
//! `applicationServerKey`, so rotating it invalidates every subscription.

// Rust guideline compliant 2026-02

pub mod ece;
pub mod frame;
pub mod payload;
pub mod push;
pub mod vapid;

pub use payload::{NotificationPayload, ReminderPayload, TestPayload};
pub use push::{DeliveryResult, PushDispatcher, PushSender, PushSubscription};
pub use vapid::{VapidKeys, VapidSigner};
