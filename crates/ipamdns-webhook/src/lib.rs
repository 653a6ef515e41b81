// # NetBox Webhook Receiver
//
// This crate turns NetBox IP address webhooks into reconciliations.
//
// ## Request Handling
//
// Every path is accepted; only the method, signature and body matter.
//
// | Condition                                   | Status | Body                                 |
// |---------------------------------------------|--------|--------------------------------------|
// | method other than POST                      | 405    | `Method not allowed`                 |
// | secret set, `X-Hook-Signature` missing/bad  | 403    | `X-Hook-Signature missing or invalid`|
// | body is not a notification                  | 400    | parse error                          |
// | model other than `ipaddress`                | 400    | `Wrong model`                        |
// | unusable address or name                    | 400    | validation error                     |
// | reconciliation recorded failures            | 500    | one line per failure                 |
// | otherwise                                   | 200    | `OK`                                 |
//
// ## Security Requirements
//
// - The webhook secret NEVER appears in logs or Debug output
// - Signatures are compared in constant time

pub mod payload;
mod signature;

pub use payload::{AddressSnapshot, Notification, Snapshots};
pub use signature::{SIGNATURE_HEADER, WebhookSecret};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use ipamdns_core::ReconcileEngine;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Request-level failures, each mapped to one HTTP status
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("X-Hook-Signature missing or invalid")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Wrong model")]
    WrongModel,

    #[error(transparent)]
    InvalidEvent(ipamdns_core::Error),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::WrongModel | Self::InvalidEvent(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Shared state of the receiver
#[derive(Clone)]
pub struct WebhookState {
    engine: Arc<ReconcileEngine>,
    secret: Option<Arc<WebhookSecret>>,
}

impl WebhookState {
    /// Without a secret every request is accepted unsigned
    pub fn new(engine: Arc<ReconcileEngine>, secret: Option<WebhookSecret>) -> Self {
        Self {
            engine,
            secret: secret.map(Arc::new),
        }
    }

    pub fn engine(&self) -> &ReconcileEngine {
        &self.engine
    }

    pub fn requires_signature(&self) -> bool {
        self.secret.is_some()
    }
}

impl std::fmt::Debug for WebhookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookState")
            .field("zones", &self.engine.zones().len())
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Router that sends every request to the webhook handler
pub fn router(state: WebhookState) -> Router {
    Router::new().fallback(handle_webhook).with_state(state)
}

/// Serve the receiver until `shutdown` completes
///
/// In-flight requests are allowed to finish.
pub async fn serve<F>(listener: TcpListener, state: WebhookState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Webhook receiver listening on http://{}/", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process(&state, &method, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            warn!(status = e.status().as_u16(), "Rejected webhook: {}", e);
            e.into_response()
        }
    }
}

async fn process(
    state: &WebhookState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, WebhookError> {
    if *method != Method::POST {
        return Err(WebhookError::MethodNotAllowed);
    }

    if let Some(secret) = &state.secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(WebhookError::Forbidden)?;
        if !secret.verify(body, signature) {
            return Err(WebhookError::Forbidden);
        }
    }

    let notification = Notification::from_slice(body)?;
    let event = notification.to_event()?;
    debug!(
        action = notification.event.as_deref().unwrap_or("unknown"),
        timestamp = ?notification.timestamp(),
        username = notification.username.as_deref().unwrap_or(""),
        request_id = notification.request_id.as_deref().unwrap_or(""),
        "Received {}",
        event
    );

    let report = match notification.former_name() {
        Some(former_name) => state.engine.reconcile_deletion(event, former_name).await,
        None => state.engine.reconcile(event).await,
    };
    if report.is_success() {
        Ok((StatusCode::OK, "OK").into_response())
    } else {
        let body: String = report
            .failure_lines()
            .into_iter()
            .map(|line| line + "\n")
            .collect();
        Ok((StatusCode::INTERNAL_SERVER_ERROR, body).into_response())
    }
}
