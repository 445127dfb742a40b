//! Mention processor — handles one inbound activity end to end.
//!
//! Flow:
//! 1. Decode gate: only a `Create` wrapping a `Note` continues
//! 2. Self guard and mention filter (no I/O) → may short-circuit
//! 3. Translation (errors propagate to the worker)
//! 4. Author resolution, reply composition, signed delivery

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::compose::ReplyComposer;
use super::delivery::{DeliveryAttempter, DeliveryOutcome};
use super::mention::{Eligibility, MentionFilter};
use crate::activitypub::{BotIdentity, InboundActivity};
use crate::error::PipelineError;
use crate::translate::Translator;

/// Why an activity produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotACreateNote,
    SelfAuthored,
    NotMentioned,
    OnlyMention,
}

impl IgnoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotACreateNote => "not_a_note",
            Self::SelfAuthored => "self_authored",
            Self::NotMentioned => "not_mentioned",
            Self::OnlyMention => "only_mention",
        }
    }
}

/// Result of handling one activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Replied(DeliveryOutcome),
}

/// Anything the worker can hand a dequeued activity to.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn handle(&self, activity: &InboundActivity) -> Result<Outcome, PipelineError>;
}

/// Translates posts that mention the bot and replies to their authors.
pub struct MentionProcessor {
    identity: BotIdentity,
    filter: MentionFilter,
    translator: Arc<dyn Translator>,
    composer: ReplyComposer,
    delivery: DeliveryAttempter,
}

impl MentionProcessor {
    pub fn new(
        identity: BotIdentity,
        translator: Arc<dyn Translator>,
        delivery: DeliveryAttempter,
    ) -> Self {
        Self {
            filter: MentionFilter::new(&identity),
            composer: ReplyComposer::new(identity.clone()),
            identity,
            translator,
            delivery,
        }
    }
}

#[async_trait]
impl ActivityHandler for MentionProcessor {
    async fn handle(&self, activity: &InboundActivity) -> Result<Outcome, PipelineError> {
        let Some(post) = activity.post() else {
            return Ok(Outcome::Ignored(IgnoreReason::NotACreateNote));
        };

        if self.identity.is_self(&post.author) {
            debug!(post = %post.id, "Ignoring post authored by the bot");
            return Ok(Outcome::Ignored(IgnoreReason::SelfAuthored));
        }

        let text = match self.filter.evaluate(&post.body) {
            Eligibility::Text(text) => text,
            Eligibility::NotMentioned => {
                return Ok(Outcome::Ignored(IgnoreReason::NotMentioned));
            }
            Eligibility::OnlyMention => {
                return Ok(Outcome::Ignored(IgnoreReason::OnlyMention));
            }
        };

        info!(post = %post.id, author = %post.author, "Translating mention");

        let translation = self.translator.translate(&text, None).await?;
        let target = self.translator.default_target();

        let author = self.delivery.resolve_author(&post.author).await?;
        let reply = self.composer.compose(&post, &author, &translation, target);

        let outcome = self.delivery.deliver(&author.inbox, &reply).await;
        if outcome.is_delivered() {
            info!(
                post = %post.id,
                source = %translation.source_language(),
                target = %target,
                "Translation reply sent"
            );
        }
        Ok(Outcome::Replied(outcome))
    }
}
