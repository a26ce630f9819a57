//! Inbound webhook listener for Slack Events API deliveries.
//!
//! Starts an axum HTTP server and dispatches each POST through four terminal
//! states:
//! 1. Malformed JSON: 400, nothing else happens.
//! 2. `url_verification`: echo the challenge. This is the one documented
//!    unsigned request (Slack sends it before the signing secret round-trips),
//!    so it is answered before the signature gate; the body shape is checked
//!    strictly to keep that unsigned surface narrow.
//! 3. Signature failure: 401.
//! 4. `event_callback`: deduplicate, submit a background classification job,
//!    and acknowledge immediately. Any other verified type is acknowledged as
//!    unhandled.
//!
//! Classification and reply failures never reach the HTTP caller; by then
//! the acknowledgment has been sent. They surface in logs and on the
//! pipeline's completion channel.

use crate::dedupe::SeenEvents;
use crate::event::{self, EventEnvelope};
use crate::pipeline::{IncidentJob, Pipeline};
use crate::signature;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Largest accepted request body. Event payloads are a few KiB; anything
/// bigger is noise.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// ── Shared state ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub signing_secret: String,
    pub pipeline: Arc<Pipeline>,
    pub seen: Arc<SeenEvents>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(handle_event))
        .route("/healthz", get(|| async { "ok" }))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// ── Route handler ─────────────────────────────────────────────────────────────

/// POST /slack/events receives an Events API delivery.
///
/// The raw body bytes are kept verbatim for signature computation; parsing
/// happens on a copy of the same buffer.
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("events: invalid JSON: {e}");
            return (StatusCode::BAD_REQUEST, "Malformed JSON body").into_response();
        }
    };

    if envelope.kind == "url_verification" {
        return match event::handshake_challenge(&envelope) {
            Some(challenge) => Json(serde_json::json!({ "challenge": challenge })).into_response(),
            None => {
                tracing::warn!("events: malformed url_verification body");
                (StatusCode::BAD_REQUEST, "Malformed handshake").into_response()
            }
        };
    }

    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let sig = header_str(&headers, SIGNATURE_HEADER);
    if !signature::verify(timestamp, sig, &body, &state.signing_secret, unix_now()) {
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    if envelope.kind != "event_callback" {
        tracing::debug!(kind = %envelope.kind, "events: unhandled envelope type");
        return (StatusCode::OK, "Unhandled event").into_response();
    }

    dispatch_callback(&state, &envelope);
    (StatusCode::OK, "OK").into_response()
}

/// Submit the background pipeline job for a verified `event_callback`.
///
/// Skips duplicates and non-classifiable events; in every case the HTTP
/// response is the same acknowledgment, so this returns nothing.
fn dispatch_callback(state: &AppState, envelope: &EventEnvelope) {
    if let Some(id) = envelope.event_id.as_deref() {
        if !state.seen.first_seen(id) {
            tracing::debug!(event_id = %id, "events: duplicate delivery skipped");
            return;
        }
    }

    let Some(incident) = envelope.event.as_ref().and_then(event::extract_incident) else {
        tracing::debug!("events: callback carries no classifiable message");
        return;
    };

    state.pipeline.submit(IncidentJob {
        channel: incident.channel,
        text: incident.text,
        event_id: envelope.event_id.clone(),
    });
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Current Unix timestamp in whole seconds.
fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Server startup ────────────────────────────────────────────────────────────

/// Bind and serve until ctrl-c.
pub async fn run(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("events: listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("events: shutdown signal received");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
