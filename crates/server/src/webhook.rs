//! Webhook endpoints:
//! - `GET  /webhook` — one-time verification handshake
//! - `POST /webhook` — event ingestion (batched, acknowledged immediately)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use innkeeper_messenger::events::{EventContext, EventDispatcher, HandlerResult};
use innkeeper_messenger::messages::OutboundMessage;
use innkeeper_messenger::send::spawn_send;
use innkeeper_messenger::wire::{verify_subscription, VerifyOutcome, VerifyParams, WebhookPayload};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use crate::bootstrap::AppState;

pub const EVENT_RECEIVED_ACK: &str = "EVENT_RECEIVED";

pub fn router(state: AppState) -> Router {
    Router::new().route("/webhook", get(verify).post(ingest)).with_state(state)
}

pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let expected_token = state.config.messenger.verify_token.expose_secret();
    match verify_subscription(&params, expected_token) {
        VerifyOutcome::Verified { challenge } => {
            info!(
                event_name = "webhook.verified",
                correlation_id = "verification",
                "webhook subscription verified"
            );
            (StatusCode::OK, challenge)
        }
        VerifyOutcome::Forbidden => {
            warn!(
                event_name = "webhook.verification_rejected",
                correlation_id = "verification",
                "verification mode or token mismatch"
            );
            (StatusCode::FORBIDDEN, String::new())
        }
        VerifyOutcome::Incomplete => (
            StatusCode::BAD_REQUEST,
            "hub.mode and hub.verify_token query parameters are required".to_string(),
        ),
    }
}

pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> (StatusCode, &'static str) {
    if !payload.is_page_subscription() {
        warn!(
            event_name = "webhook.unrecognized_source",
            correlation_id = "ingest",
            object = %payload.object,
            "ignoring webhook payload from unexpected subscription object"
        );
        return (StatusCode::NOT_FOUND, "");
    }

    let ctx = EventContext::new();
    let replies = gather_replies(&state.dispatcher, &payload, &ctx).await;
    for (psid, message) in replies {
        spawn_send(state.send_client.clone(), psid, message, ctx.correlation_id.clone());
    }

    (StatusCode::OK, EVENT_RECEIVED_ACK)
}

/// Route every event in the batch and collect the addressed replies. A
/// failing handler is logged and skipped so the rest of the batch still
/// goes out.
pub async fn gather_replies(
    dispatcher: &EventDispatcher,
    payload: &WebhookPayload,
    ctx: &EventContext,
) -> Vec<(String, OutboundMessage)> {
    let mut replies = Vec::new();
    for event in payload.events() {
        match dispatcher.dispatch(&event, ctx).await {
            Ok(HandlerResult::Responded(message)) => {
                replies.push((event.psid().to_owned(), message));
            }
            Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
            Err(dispatch_error) => {
                error!(
                    event_name = "webhook.event_failed",
                    correlation_id = %ctx.correlation_id,
                    psid = %event.psid(),
                    error = %dispatch_error,
                    "event handling failed, continuing with the rest of the batch"
                );
            }
        }
    }
    replies
}
