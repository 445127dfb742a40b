//! Actor-facing REST endpoints: inbox, actor document, collections, health.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::discovery;
use crate::activitypub::types::{ACTIVITY_JSON, ACTIVITY_STREAMS_CONTEXT};
use crate::activitypub::{BotIdentity, InboundActivity, Person};
use crate::config::BotProfile;
use crate::pipeline::ActivitySender;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: BotIdentity,
    pub profile: BotProfile,
    pub person: Arc<Person>,
    pub queue: ActivitySender,
}

/// Build the full router for the bot.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/{username}", get(get_actor))
        .route("/users/{username}/inbox", post(post_inbox))
        .route("/users/{username}/followers", get(get_followers))
        .route("/users/{username}/outbox", get(get_outbox))
        .route("/.well-known/webfinger", get(discovery::webfinger))
        .route("/.well-known/nodeinfo", get(discovery::nodeinfo_links))
        .route("/nodeinfo/2.1", get(discovery::nodeinfo))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serialize `value` as an ActivityStreams document.
pub(super) fn activity_json(value: impl serde::Serialize) -> Response {
    ([(header::CONTENT_TYPE, ACTIVITY_JSON)], Json(value)).into_response()
}

pub(super) fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Actor ───────────────────────────────────────────────────────────────

async fn get_actor(State(state): State<AppState>, Path(username): Path<String>) -> Response {
    if !state.identity.owns_username(&username) {
        return not_found();
    }
    activity_json(state.person.as_ref())
}

async fn get_followers(State(state): State<AppState>, Path(username): Path<String>) -> Response {
    if !state.identity.owns_username(&username) {
        return not_found();
    }
    activity_json(empty_collection(&state.identity.followers_url()))
}

async fn get_outbox(State(state): State<AppState>, Path(username): Path<String>) -> Response {
    if !state.identity.owns_username(&username) {
        return not_found();
    }
    activity_json(empty_collection(&state.identity.outbox_url()))
}

fn empty_collection(id: &str) -> serde_json::Value {
    json!({
        "@context": ACTIVITY_STREAMS_CONTEXT,
        "id": id,
        "type": "OrderedCollection",
        "totalItems": 0,
        "orderedItems": [],
    })
}

// ── Inbox ───────────────────────────────────────────────────────────────

/// POST /users/{username}/inbox
///
/// Acknowledges immediately. `Create` activities are queued for the worker;
/// everything else is accepted and dropped.
async fn post_inbox(
    State(state): State<AppState>,
    Path(username): Path<String>,
    body: Bytes,
) -> Response {
    if !state.identity.owns_username(&username) {
        return not_found();
    }

    let activity: InboundActivity = match serde_json::from_slice(&body) {
        Ok(activity) => activity,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed inbox payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid activity"})),
            )
                .into_response();
        }
    };

    if !matches!(activity, InboundActivity::Create(_)) {
        debug!("Ignoring non-Create activity");
        return StatusCode::ACCEPTED.into_response();
    }

    let activity_id = activity.id().unwrap_or_default().to_string();
    match state.queue.enqueue(activity) {
        Ok(item) => {
            info!(item = %item, activity = %activity_id, "Activity queued");
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            error!(activity = %activity_id, error = %e, "Failed to queue activity");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Inbox unavailable"})),
            )
                .into_response()
        }
    }
}
