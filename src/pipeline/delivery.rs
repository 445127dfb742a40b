//! Delivery attempter — resolves the author, signs and transmits replies.
//!
//! Author resolution failures propagate to the caller. Everything after
//! composition is best-effort: missing key material and transport faults are
//! logged here and reported as a [`DeliveryOutcome`], never as an error.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::compose::ReplyActivity;
use crate::activitypub::keys::select_key;
use crate::activitypub::{
    ActorRecord, ActorResolver, BotIdentity, KeyStore, SigningScheme, Transport,
};
use crate::error::FederationError;

/// How a delivery attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The remote inbox accepted the reply.
    Delivered { status: u16 },
    /// The remote inbox answered with a non-success status.
    Rejected { status: u16 },
    /// The request never completed (network, TLS, signing).
    Failed,
    /// No usable signing key for the bot.
    NoSigningKey,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

pub struct DeliveryAttempter {
    resolver: Arc<dyn ActorResolver>,
    keys: Arc<dyn KeyStore>,
    transport: Arc<dyn Transport>,
    identity: BotIdentity,
    scheme: SigningScheme,
}

impl DeliveryAttempter {
    pub fn new(
        resolver: Arc<dyn ActorResolver>,
        keys: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
        identity: BotIdentity,
    ) -> Self {
        Self {
            resolver,
            keys,
            transport,
            identity,
            scheme: SigningScheme::DraftCavage,
        }
    }

    /// Look up the destination actor. Must run before the reply is composed,
    /// since the mention name comes from the resolved record.
    pub async fn resolve_author(&self, author: &str) -> Result<ActorRecord, FederationError> {
        self.resolver.fetch_actor(author).await
    }

    /// Sign and send `reply` to `inbox`.
    pub async fn deliver(&self, inbox: &str, reply: &ReplyActivity) -> DeliveryOutcome {
        let keys = match self.keys.signing_keys(self.identity.username()).await {
            Ok(keys) => keys,
            Err(e) => {
                error!(identity = %self.identity.username(), error = %e, "Failed to load signing keys");
                return DeliveryOutcome::NoSigningKey;
            }
        };
        let Some(key) = select_key(keys, self.scheme.key_kind()) else {
            error!(
                identity = %self.identity.username(),
                scheme = %self.scheme,
                "No usable signing key, dropping reply"
            );
            return DeliveryOutcome::NoSigningKey;
        };

        let body = match serde_json::to_vec(reply) {
            Ok(body) => body,
            Err(e) => {
                error!(reply = %reply.id, error = %e, "Failed to serialise reply");
                return DeliveryOutcome::Failed;
            }
        };

        match self.transport.post(inbox, &body, self.scheme, &key).await {
            Ok(resp) if resp.is_success() => {
                info!(inbox = %inbox, reply = %reply.id, status = resp.status, "Reply delivered");
                DeliveryOutcome::Delivered {
                    status: resp.status,
                }
            }
            Ok(resp) => {
                warn!(
                    inbox = %inbox,
                    reply = %reply.id,
                    status = resp.status,
                    body = %resp.body_excerpt(),
                    "Remote inbox rejected reply"
                );
                DeliveryOutcome::Rejected {
                    status: resp.status,
                }
            }
            Err(e) => {
                error!(inbox = %inbox, reply = %reply.id, error = %e, "Reply delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }
}
