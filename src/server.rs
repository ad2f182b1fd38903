//! HTTP trigger for the reminder job.
//!
//! An external scheduler POSTs here (optionally with `{"test": true}`) and
//! receives the job report. Any body that is not valid JSON is treated as
//! an empty request.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::reminders::{JobReport, ReminderJob};

/// Body accepted by the trigger routes.
#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    #[serde(default)]
    test: bool,
}

/// Job-level failure, rendered as `500 {"error": "..."}`.
///
/// Only the outermost context reaches the client; the full chain is logged.
#[derive(Debug)]
struct TriggerError(anyhow::Error);

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.0.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Build the router with trigger, health and CORS handling.
pub fn router(job: Arc<ReminderJob>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/", post(trigger))
        .route("/send-habit-reminders", post(trigger))
        .route("/health", get(health))
        .layer(cors)
        .with_state(job)
}

async fn health() -> &'static str {
    "ok"
}

async fn trigger(
    State(job): State<Arc<ReminderJob>>,
    body: Bytes,
) -> Result<Json<JobReport>, TriggerError> {
    let request: TriggerRequest = serde_json::from_slice(&body).unwrap_or_default();
    log::info!("[Reminders] Trigger received (test: {})", request.test);

    match job.run(request.test).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            log::error!("[Reminders] Job failed: {e:#}");
            Err(TriggerError(e))
        }
    }
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_listener(
    listener: TcpListener,
    job: Arc<ReminderJob>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(job))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, job: Arc<ReminderJob>) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid listen address: {addr}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("[Server] Listening on http://{}", listener.local_addr()?);

    serve_listener(listener, job, shutdown_signal()).await?;
    log::info!("[Server] Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("[Server] Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("[Server] Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_request_lenient_parsing() {
        let parse = |body: &[u8]| -> bool {
            serde_json::from_slice::<TriggerRequest>(body)
                .unwrap_or_default()
                .test
        };
        assert!(parse(br#"{"test": true}"#));
        assert!(!parse(br#"{"test": false}"#));
        assert!(!parse(b"{}"));
        assert!(!parse(b""));
        assert!(!parse(b"not json"));
        assert!(!parse(br#"{"test": "yes"}"#));
    }

    #[tokio::test]
    async fn test_error_response_hides_cause_chain() {
        let error = anyhow::anyhow!("HTTP 401: Invalid API key").context("Failed to list push subscriptions");
        let response = TriggerError(error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Failed to list push subscriptions" }));
    }
}
