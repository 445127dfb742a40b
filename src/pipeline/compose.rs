//! Reply composer — turns a translation into the `Create(Note)` sent back to
//! the post's author. Pure; performs no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activitypub::types::{ACTIVITY_STREAMS_CONTEXT, ActorRecord, InboundPost, host_of};
use crate::activitypub::{BotIdentity, PUBLIC_COLLECTION};
use crate::translate::TranslationResult;

/// Link from the reply to the post it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyLink {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A `Mention` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionTag {
    #[serde(rename = "type")]
    pub kind: String,
    pub href: String,
    pub name: String,
}

/// The reply post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyNote {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributed_to: String,
    pub content: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub in_reply_to: ReplyLink,
    pub published: DateTime<Utc>,
    pub tag: Vec<MentionTag>,
}

/// The `Create` wrapper that carries a reply to its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyActivity {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: String,
    pub object: ReplyNote,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub published: DateTime<Utc>,
}

/// Builds replies on behalf of the bot.
#[derive(Debug, Clone)]
pub struct ReplyComposer {
    identity: BotIdentity,
}

impl ReplyComposer {
    pub fn new(identity: BotIdentity) -> Self {
        Self { identity }
    }

    /// Compose the reply to `post`.
    ///
    /// `author` must be the resolved record of `post.author`; `target_language`
    /// is the language the text was translated into.
    pub fn compose(
        &self,
        post: &InboundPost,
        author: &ActorRecord,
        translation: &TranslationResult,
        target_language: &str,
    ) -> ReplyActivity {
        debug_assert!(!post.id.is_empty(), "reply target must have an id");

        let now = Utc::now();
        let actor = self.identity.actor_url();
        let username = author.display_token();
        let to = vec![post.author.clone()];
        let cc = vec![PUBLIC_COLLECTION.to_string()];

        let content = format!(
            r#"<p><span class="h-card"><a href="{href}" class="u-url mention">@{user}</a></span> 🌐 <strong>[{src} → {dst}]</strong><br>{text}</p>"#,
            href = escape_html(&post.author),
            user = escape_html(username),
            src = language_tag(translation.source_language()),
            dst = language_tag(target_language),
            text = escape_html(&translation.translated_text),
        );

        let note = ReplyNote {
            id: self.identity.new_note_id(),
            kind: "Note".to_string(),
            attributed_to: actor.clone(),
            content,
            to: to.clone(),
            cc: cc.clone(),
            in_reply_to: ReplyLink {
                id: post.id.clone(),
                kind: "Note".to_string(),
            },
            published: now,
            tag: vec![MentionTag {
                kind: "Mention".to_string(),
                href: post.author.clone(),
                name: format!("@{username}@{}", host_of(&post.author)),
            }],
        };

        ReplyActivity {
            context: ACTIVITY_STREAMS_CONTEXT.to_string(),
            id: self.identity.new_create_id(),
            kind: "Create".to_string(),
            actor,
            object: note,
            to,
            cc,
            published: now,
        }
    }
}

fn language_tag(code: &str) -> String {
    escape_html(&code.to_uppercase())
}

/// Escape text for inclusion in an HTML body.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
