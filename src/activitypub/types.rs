//! Inbound ActivityStreams shapes and the post extracted from them.
//!
//! Only the shapes the relay acts on are modelled. Anything else decodes to an
//! `Other` variant so that unknown traffic is a normal, ignorable case rather
//! than a decoding error.

use serde::{Deserialize, Deserializer, Serialize};

/// The public addressing collection.
pub const PUBLIC_COLLECTION: &str = "https://www.w3.org/ns/activitystreams#Public";

/// JSON-LD context for outgoing documents.
pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Media type for ActivityPub documents.
pub const ACTIVITY_JSON: &str = "application/activity+json";

/// An inbound activity as received by the inbox.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundActivity {
    Create(Create),
    #[serde(other)]
    Other,
}

impl InboundActivity {
    /// Activity identifier, when the shape carries one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Create(create) => Some(&create.id),
            Self::Other => None,
        }
    }

    /// The post carried by this activity, if it is a `Create` wrapping a `Note`.
    pub fn post(&self) -> Option<InboundPost> {
        let Self::Create(create) = self else {
            return None;
        };
        let ObjectRef::Embedded(Object::Note(note)) = &create.object else {
            return None;
        };
        Some(InboundPost {
            id: note.id.clone(),
            author: create.actor.id().to_string(),
            body: note.content.clone().unwrap_or_default(),
            to: note.to.clone(),
            cc: note.cc.clone(),
        })
    }
}

/// A `Create` activity.
#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub id: String,
    pub actor: ActorRef,
    pub object: ObjectRef,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

/// An actor given either by URI or as an embedded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActorRef {
    Uri(String),
    Embedded { id: String },
}

impl ActorRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Uri(id) | Self::Embedded { id } => id,
        }
    }
}

/// The object of an activity: a bare link or an embedded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Uri(String),
    Embedded(Object),
}

/// Embedded object shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Object {
    Note(Note),
    #[serde(other)]
    Other,
}

/// A `Note` as rendered by the sending server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// Rendered HTML body.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

/// A post that may mention the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundPost {
    pub id: String,
    pub author: String,
    /// Rendered markup.
    pub body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

/// A remote actor as resolved for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRecord {
    pub id: String,
    pub inbox: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl ActorRecord {
    /// Username used in handles, falling back to the last path segment of the id.
    pub fn display_token(&self) -> &str {
        match self.preferred_username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => last_path_segment(&self.id),
        }
    }
}

/// Last non-empty path segment of a URI.
pub fn last_path_segment(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

/// Host part of a URI, or the empty string when it has none.
pub fn host_of(uri: &str) -> String {
    reqwest::Url::parse(uri)
        .ok()
        .and_then(|u| {
            u.host_str().map(|h| match u.port() {
                Some(port) => format!("{h}:{port}"),
                None => h.to_string(),
            })
        })
        .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}
