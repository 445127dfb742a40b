//! WebFinger and NodeInfo discovery endpoints.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::routes::{AppState, activity_json, not_found};
use crate::activitypub::types::ACTIVITY_JSON;

const JRD_JSON: &str = "application/jrd+json";
const NODEINFO_SCHEMA: &str = "http://nodeinfo.diaspora.software/ns/schema/2.1";

#[derive(Debug, Deserialize)]
pub(super) struct WebfingerQuery {
    resource: Option<String>,
}

/// Split `acct:user@host` (the `acct:` scheme and a leading `@` are optional).
fn parse_acct(resource: &str) -> Option<(&str, &str)> {
    let acct = resource.strip_prefix("acct:").unwrap_or(resource);
    let acct = acct.strip_prefix('@').unwrap_or(acct);
    let (user, host) = acct.split_once('@')?;
    if user.is_empty() || host.is_empty() || host.contains('@') {
        return None;
    }
    Some((user, host))
}

/// GET /.well-known/webfinger?resource=acct:user@domain
pub(super) async fn webfinger(
    State(state): State<AppState>,
    Query(query): Query<WebfingerQuery>,
) -> Response {
    let Some(resource) = query.resource.as_deref() else {
        return bad_resource();
    };

    let actor_url = state.identity.actor_url();
    let known = if resource == actor_url {
        true
    } else {
        let Some((user, host)) = parse_acct(resource) else {
            return bad_resource();
        };
        state.identity.owns_username(user) && host.eq_ignore_ascii_case(state.identity.domain())
    };
    if !known {
        return not_found();
    }

    let jrd = json!({
        "subject": format!("acct:{}@{}", state.identity.username(), state.identity.domain()),
        "aliases": [actor_url],
        "links": [{
            "rel": "self",
            "type": ACTIVITY_JSON,
            "href": actor_url,
        }],
    });
    ([(header::CONTENT_TYPE, JRD_JSON)], Json(jrd)).into_response()
}

fn bad_resource() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Missing or invalid resource"})),
    )
        .into_response()
}

/// GET /.well-known/nodeinfo
pub(super) async fn nodeinfo_links(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "links": [{
            "rel": NODEINFO_SCHEMA,
            "href": format!("https://{}/nodeinfo/2.1", state.identity.domain()),
        }]
    }))
}

/// GET /nodeinfo/2.1
pub(super) async fn nodeinfo(State(state): State<AppState>) -> Response {
    activity_json(json!({
        "version": "2.1",
        "software": {
            "name": "translate-bot",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "protocols": ["activitypub"],
        "services": {"inbound": [], "outbound": []},
        "openRegistrations": false,
        "usage": {"users": {"total": 1}},
        "metadata": {"nodeName": state.profile.display_name},
    }))
}
