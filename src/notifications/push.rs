//! Web push delivery (RFC 8030) with VAPID authentication (RFC 8292).
//!
//! [`PushDispatcher`] signs a token, encrypts and frames the payload, and
//! POSTs it to the subscription endpoint. It never retries and never
//! touches storage: the caller reads the [`DeliveryResult`] and decides
//! whether to drop the subscription.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{self, CONTENT_ENCODING_AES128GCM, PUSH_URGENCY};
use crate::notifications::ece;
use crate::notifications::vapid::{audience_for, VapidSigner};

/// A browser's push subscription.
///
/// Contains everything needed to send a web push message to this browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// Outcome of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// Whether the push service accepted the message.
    pub success: bool,
    /// HTTP status from the push service, if a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response body or local error text on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    /// Accepted by the push service.
    pub fn delivered(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            error: None,
        }
    }

    /// Rejected by the push service with `status_code`.
    pub fn rejected(status_code: u16, body: String) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            error: Some(body),
        }
    }

    /// Failed before a response arrived (crypto, transport, timeout).
    pub fn failed(error: &anyhow::Error) -> Self {
        Self {
            success: false,
            status_code: None,
            error: Some(format!("{error:#}")),
        }
    }

    /// The push service reported the subscription as expired or unknown.
    ///
    /// Such subscriptions must be deleted and never retried.
    pub fn is_gone(&self) -> bool {
        matches!(self.status_code, Some(404 | 410))
    }
}

/// Anything that can deliver a JSON payload to a subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver `payload` to `subscription`. Never returns an error; failures
    /// are reported in the result.
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> DeliveryResult;
}

/// A fully prepared push request.
#[derive(Debug, Clone)]
pub struct PreparedPush {
    /// Target endpoint.
    pub endpoint: String,
    /// `Authorization: vapid t=..., k=...` header value.
    pub authorization: String,
    /// `aes128gcm` framed body.
    pub body: Vec<u8>,
}

/// Sends encrypted web push messages over HTTP.
///
/// Holds a single `reqwest::Client` so deliveries share a connection pool.
#[derive(Debug, Clone)]
pub struct PushDispatcher {
    client: reqwest::Client,
    signer: VapidSigner,
    ttl_secs: u32,
}

impl PushDispatcher {
    /// Create a dispatcher with its own HTTP client.
    pub fn new(signer: VapidSigner, ttl_secs: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(constants::HTTP_REQUEST_TIMEOUT)
            .user_agent(constants::user_agent())
            .build()
            .context("Failed to build push HTTP client")?;
        Ok(Self::with_client(client, signer, ttl_secs))
    }

    /// Create a dispatcher with a pre-configured HTTP client.
    pub fn with_client(client: reqwest::Client, signer: VapidSigner, ttl_secs: u32) -> Self {
        Self {
            client,
            signer,
            ttl_secs,
        }
    }

    /// Sign, encrypt and frame a payload without sending it.
    pub fn prepare(&self, subscription: &PushSubscription, payload: &str) -> Result<PreparedPush> {
        let token = self
            .signer
            .sign(&subscription.endpoint)
            .context("Failed to sign VAPID JWT")?;
        let encrypted = ece::encrypt(payload.as_bytes(), &subscription.p256dh, &subscription.auth)
            .context("Failed to encrypt push payload")?;

        Ok(PreparedPush {
            endpoint: subscription.endpoint.clone(),
            authorization: self.signer.authorization_header(&token),
            body: encrypted.to_frame(),
        })
    }

    async fn deliver(&self, subscription: &PushSubscription, payload: &str) -> Result<DeliveryResult> {
        let prepared = self.prepare(subscription, payload)?;

        let response = self
            .client
            .post(&prepared.endpoint)
            .header("Authorization", prepared.authorization)
            .header("Content-Type", "application/octet-stream")
            .header("Content-Encoding", CONTENT_ENCODING_AES128GCM)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", PUSH_URGENCY)
            .body(prepared.body)
            .send()
            .await
            .context("Web push HTTP request failed")?;

        let status = response.status().as_u16();
        let origin = log_origin(&subscription.endpoint);

        match status {
            200..=299 => {
                log::debug!("[WebPush] Delivered to {origin} (HTTP {status})");
                Ok(DeliveryResult::delivered(status))
            }
            404 | 410 => {
                log::info!("[WebPush] Subscription expired at {origin} (HTTP {status})");
                let body = response.text().await.unwrap_or_default();
                Ok(DeliveryResult::rejected(status, body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                log::warn!("[WebPush] Push to {origin} failed (HTTP {status}): {body}");
                Ok(DeliveryResult::rejected(status, body))
            }
        }
    }
}

#[async_trait]
impl PushSender for PushDispatcher {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> DeliveryResult {
        match self.deliver(subscription, payload).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!(
                    "[WebPush] Push to {} failed: {e:#}",
                    log_origin(&subscription.endpoint)
                );
                DeliveryResult::failed(&e)
            }
        }
    }
}

/// Endpoint reduced to its origin; the path identifies the subscriber.
fn log_origin(endpoint: &str) -> String {
    audience_for(endpoint).unwrap_or_else(|_| "<invalid endpoint>".to_string())
}
