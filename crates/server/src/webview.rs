//! Webview hand-off endpoints:
//! - `GET /options` — the room-preferences form page, framed inside the
//!   platform's webview (framing permission depends on the referrer host)
//! - `GET /optionspostback` — form submission callback; acknowledges the
//!   browser and spawns the confirmation chat reply

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use innkeeper_messenger::events::{
    EventContext, FormSubmissionEvent, HandlerResult, InboundEvent,
};
use innkeeper_messenger::send::spawn_send;
use serde::Deserialize;
use tracing::{error, warn};

use crate::bootstrap::AppState;

pub const CLOSE_WINDOW_INSTRUCTION: &str =
    "Please close this window to return to the conversation thread.";

const MESSENGER_HOST: &str = "www.messenger.com";
const FACEBOOK_HOST: &str = "www.facebook.com";

#[derive(Clone)]
struct WebviewState {
    app: AppState,
    options_page: Arc<str>,
}

pub fn router(app: AppState) -> Router {
    let state = WebviewState { options_page: load_options_page(&app.assets_dir), app };
    Router::new()
        .route("/options", get(options))
        .route("/optionspostback", get(options_postback))
        .with_state(state)
}

fn load_options_page(assets_dir: &Path) -> Arc<str> {
    let page_path = assets_dir.join("options.html");
    match std::fs::read_to_string(&page_path) {
        Ok(contents) => contents.into(),
        Err(read_error) => {
            warn!(
                event_name = "webview.options_page_fallback",
                correlation_id = "bootstrap",
                path = %page_path.display(),
                error = %read_error,
                "could not read the form page from the assets dir, serving embedded copy"
            );
            include_str!("../public/options.html").into()
        }
    }
}

/// Framing permission for the form page. Only the two platform hosts get an
/// ALLOW-FROM grant; anyone else gets the page without one.
fn frame_permission(referer: &str) -> Option<&'static str> {
    if referer.contains(MESSENGER_HOST) {
        Some("ALLOW-FROM https://www.messenger.com/")
    } else if referer.contains(FACEBOOK_HOST) {
        Some("ALLOW-FROM https://www.facebook.com/")
    } else {
        None
    }
}

async fn options(State(state): State<WebviewState>, headers: HeaderMap) -> Response {
    let Some(referer) = headers.get(header::REFERER).and_then(|value| value.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "Referer header is required").into_response();
    };

    let mut response = Html(state.options_page.to_string()).into_response();
    if let Some(grant) = frame_permission(referer) {
        response.headers_mut().insert(header::X_FRAME_OPTIONS, HeaderValue::from_static(grant));
    }
    response
}

#[derive(Debug, Deserialize)]
struct OptionsPostbackParams {
    psid: String,
    bed: String,
    pillows: String,
    view: String,
}

async fn options_postback(
    State(state): State<WebviewState>,
    Query(params): Query<OptionsPostbackParams>,
) -> (StatusCode, &'static str) {
    let ctx = EventContext::new();
    let event = InboundEvent::FormSubmission(FormSubmissionEvent {
        psid: params.psid,
        bed: params.bed,
        pillows: params.pillows,
        view: params.view,
    });

    match state.app.dispatcher.dispatch(&event, &ctx).await {
        Ok(HandlerResult::Responded(message)) => {
            spawn_send(
                state.app.send_client.clone(),
                event.psid().to_owned(),
                message,
                ctx.correlation_id,
            );
        }
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
        Err(dispatch_error) => {
            error!(
                event_name = "webview.form_submission_failed",
                correlation_id = %ctx.correlation_id,
                psid = %event.psid(),
                error = %dispatch_error,
                "form submission handling failed"
            );
        }
    }

    // The browser acknowledgment is independent of the chat reply above.
    (StatusCode::OK, CLOSE_WINDOW_INSTRUCTION)
}
