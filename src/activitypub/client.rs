//! Outbound federation: remote actor resolution and signed delivery.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, DATE, HOST, USER_AGENT};
use tracing::debug;

use super::keys::ActorKey;
use super::signature::{SigningScheme, sign_request};
use super::types::{ACTIVITY_JSON, ActorRecord};
use crate::error::FederationError;

/// Accept header for actor lookups.
const ACTOR_ACCEPT: &str =
    r#"application/activity+json, application/ld+json; profile="https://www.w3.org/ns/activitystreams""#;

/// Default timeout for federation requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Most of a delivery response body that is kept.
pub const MAX_RESPONSE_BODY: usize = 4096;

/// Characters of a response body that go into logs.
const LOGGED_BODY_CHARS: usize = 500;

/// Response of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Leading part of the body, short enough to log.
    pub fn body_excerpt(&self) -> &str {
        match self.body.char_indices().nth(LOGGED_BODY_CHARS) {
            Some((end, _)) => &self.body[..end],
            None => &self.body,
        }
    }
}

/// Resolves remote actors to their delivery records.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    async fn fetch_actor(&self, actor_id: &str) -> Result<ActorRecord, FederationError>;
}

/// Sends signed documents to remote inboxes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        inbox: &str,
        body: &[u8],
        scheme: SigningScheme,
        key: &ActorKey,
    ) -> Result<TransportResponse, FederationError>;
}

/// HTTP implementation of both federation collaborators.
pub struct HttpFederationClient {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFederationClient {
    pub fn new(user_agent: impl Into<String>) -> Result<Self, FederationError> {
        Self::with_timeout(user_agent, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FederationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FederationError::SendFailed {
                inbox: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl ActorResolver for HttpFederationClient {
    async fn fetch_actor(&self, actor_id: &str) -> Result<ActorRecord, FederationError> {
        let resp = self
            .client
            .get(actor_id)
            .header(ACCEPT, ACTOR_ACCEPT)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FederationError::ResolveFailed {
                actor: actor_id.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FederationError::ResolveStatus {
                actor: actor_id.to_string(),
                status: status.as_u16(),
            });
        }

        let actor: ActorRecord =
            resp.json()
                .await
                .map_err(|e| FederationError::InvalidActor {
                    actor: actor_id.to_string(),
                    reason: e.to_string(),
                })?;

        debug!(actor = %actor.id, inbox = %actor.inbox, "Resolved remote actor");
        Ok(actor)
    }
}

#[async_trait]
impl Transport for HttpFederationClient {
    async fn post(
        &self,
        inbox: &str,
        body: &[u8],
        scheme: SigningScheme,
        key: &ActorKey,
    ) -> Result<TransportResponse, FederationError> {
        let url = Url::parse(inbox).map_err(|e| FederationError::InvalidUrl {
            url: inbox.to_string(),
            reason: e.to_string(),
        })?;

        let signed = sign_request(scheme, "POST", &url, body, key, Utc::now())?;

        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, ACTIVITY_JSON)
            .header(USER_AGENT, &self.user_agent)
            .header(HOST, &signed.host)
            .header(DATE, &signed.date)
            .header("Digest", &signed.digest)
            .header("Signature", &signed.signature)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| FederationError::SendFailed {
                inbox: inbox.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let body = read_capped(resp, MAX_RESPONSE_BODY).await;
        Ok(TransportResponse { status, body })
    }
}

/// Read at most `limit` bytes of a response body, dropping the rest.
async fn read_capped(mut resp: reqwest::Response, limit: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < limit {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Failed to read response body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
