//! The bot's own actor: identifiers under its namespace and its profile document.

use serde::Serialize;
use uuid::Uuid;

use super::types::ACTIVITY_STREAMS_CONTEXT;
use crate::config::BotProfile;

/// Security vocabulary context, needed for `publicKey`.
const SECURITY_CONTEXT: &str = "https://w3id.org/security/v1";

/// Addressable identity of the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    domain: String,
    username: String,
}

impl BotIdentity {
    pub fn new(domain: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
        }
    }

    pub fn from_profile(profile: &BotProfile) -> Self {
        Self::new(&profile.domain, &profile.username)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Canonical actor URI, e.g. `https://bot.test/users/translate`.
    pub fn actor_url(&self) -> String {
        format!("https://{}/users/{}", self.domain, self.username)
    }

    pub fn inbox_url(&self) -> String {
        format!("{}/inbox", self.actor_url())
    }

    pub fn outbox_url(&self) -> String {
        format!("{}/outbox", self.actor_url())
    }

    pub fn followers_url(&self) -> String {
        format!("{}/followers", self.actor_url())
    }

    /// Id of the bot's signing key.
    pub fn key_id(&self) -> String {
        format!("{}#main-key", self.actor_url())
    }

    /// Handle form, e.g. `@translate@bot.test`.
    pub fn handle(&self) -> String {
        format!("@{}@{}", self.username, self.domain)
    }

    /// A fresh note id under the bot's namespace.
    pub fn new_note_id(&self) -> String {
        format!("{}/notes/{}", self.actor_url(), Uuid::new_v4())
    }

    /// A fresh activity id under the bot's namespace.
    pub fn new_create_id(&self) -> String {
        format!("{}/creates/{}", self.actor_url(), Uuid::new_v4())
    }

    /// Whether `actor` is this bot's actor URI.
    pub fn is_self(&self, actor: &str) -> bool {
        actor.trim_end_matches('/') == self.actor_url()
    }

    /// Whether a local username (from a request path) names this bot.
    pub fn owns_username(&self, username: &str) -> bool {
        username == self.username
    }
}

/// Public key section of the actor document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub id: String,
    pub owner: String,
    pub public_key_pem: String,
}

/// The bot's `Person` document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(rename = "@context")]
    pub context: Vec<&'static str>,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub preferred_username: String,
    pub name: String,
    pub summary: String,
    pub inbox: String,
    pub outbox: String,
    pub followers: String,
    pub manually_approves_followers: bool,
    pub public_key: PublicKey,
}

impl Person {
    /// Build the actor document for the bot.
    pub fn for_bot(identity: &BotIdentity, profile: &BotProfile, public_key_pem: String) -> Self {
        let actor_url = identity.actor_url();
        Self {
            context: vec![ACTIVITY_STREAMS_CONTEXT, SECURITY_CONTEXT],
            id: actor_url.clone(),
            kind: "Person",
            preferred_username: identity.username().to_string(),
            name: profile.display_name.clone(),
            summary: profile.summary.clone(),
            inbox: identity.inbox_url(),
            outbox: identity.outbox_url(),
            followers: identity.followers_url(),
            manually_approves_followers: false,
            public_key: PublicKey {
                id: identity.key_id(),
                owner: actor_url,
                public_key_pem,
            },
        }
    }
}
