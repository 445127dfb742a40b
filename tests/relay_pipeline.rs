//! End-to-end relay behaviour: queue → worker → filter → translate → reply.
//!
//! The real queue, worker and processor run against in-memory collaborators.
//! Every test drains the queue through `ActivitySender::wait_drained` under a
//! timeout.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use translate_bot::activitypub::{
    ActorKey, ActorRecord, ActorResolver, BotIdentity, InboundActivity, KeyStore, PrivateKey,
    SigningScheme, Transport, TransportResponse,
};
use translate_bot::error::{FederationError, SigningError, TranslateError};
use translate_bot::pipeline::{
    ActivitySender, DeliveryAttempter, InboxWorker, MentionProcessor, WorkerStats, inbox_queue,
};
use translate_bot::translate::{TranslationResult, Translator};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);
const RSA_PRIVATE: &[u8] = include_bytes!("fixtures/rsa_private.pem");

/// Event log shared by all collaborators, in call order.
type Events = Arc<Mutex<Vec<String>>>;

// ── Collaborators ───────────────────────────────────────────────────────

/// Texts starting with `slow` take 150ms; `boom` fails.
struct StubTranslator {
    events: Events,
}

#[async_trait]
impl Translator for StubTranslator {
    fn default_target(&self) -> &str {
        "pt"
    }

    async fn translate(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> Result<TranslationResult, TranslateError> {
        assert_eq!(target, None);
        self.events.lock().unwrap().push(format!("translate:{text}"));
        if text.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        if text.starts_with("boom") {
            return Err(TranslateError::RequestFailed {
                reason: "simulated transport error".into(),
            });
        }
        Ok(TranslationResult {
            translated_text: match text {
                "Bonjour tout le monde" => "Olá a todos".to_string(),
                other => format!("pt({other})"),
            },
            detected_source_language: Some("fr".into()),
        })
    }
}

struct StubResolver;

#[async_trait]
impl ActorResolver for StubResolver {
    async fn fetch_actor(&self, actor_id: &str) -> Result<ActorRecord, FederationError> {
        Ok(ActorRecord {
            id: actor_id.to_string(),
            inbox: format!("{actor_id}/inbox"),
            preferred_username: Some(actor_id.rsplit('/').next().unwrap_or_default().to_string()),
        })
    }
}

struct StubKeys;

#[async_trait]
impl KeyStore for StubKeys {
    async fn signing_keys(&self, identity: &str) -> Result<Vec<ActorKey>, SigningError> {
        assert_eq!(identity, "translate");
        Ok(vec![ActorKey {
            key_id: "https://bot.test/users/translate#main-key".into(),
            private_key: PrivateKey::from_pem(RSA_PRIVATE)?,
        }])
    }
}

/// Inboxes containing `down` fail at the transport level.
struct StubTransport {
    events: Events,
    sent: Mutex<Vec<Value>>,
}

#[async_trait]
impl Transport for StubTransport {
    async fn post(
        &self,
        inbox: &str,
        body: &[u8],
        scheme: SigningScheme,
        _key: &ActorKey,
    ) -> Result<TransportResponse, FederationError> {
        assert_eq!(scheme, SigningScheme::DraftCavage);
        self.events.lock().unwrap().push(format!("deliver:{inbox}"));
        if inbox.contains("down") {
            return Err(FederationError::SendFailed {
                inbox: inbox.to_string(),
                reason: "simulated transport error".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push(serde_json::from_slice(body).unwrap());
        Ok(TransportResponse {
            status: 202,
            body: String::new(),
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

struct Harness {
    queue: ActivitySender,
    events: Events,
    transport: Arc<StubTransport>,
    stats: Arc<WorkerStats>,
    cancel: CancellationToken,
    worker: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let events: Events = Arc::default();
        let identity = BotIdentity::new("bot.test", "translate");
        let transport = Arc::new(StubTransport {
            events: Arc::clone(&events),
            sent: Mutex::new(Vec::new()),
        });
        let delivery = DeliveryAttempter::new(
            Arc::new(StubResolver),
            Arc::new(StubKeys),
            transport.clone(),
            identity.clone(),
        );
        let translator = Arc::new(StubTranslator {
            events: Arc::clone(&events),
        });
        let processor = Arc::new(MentionProcessor::new(identity, translator, delivery));

        let (queue, receiver) = inbox_queue();
        let worker = InboxWorker::new(receiver, processor, Duration::from_millis(50));
        let stats = worker.stats();
        let cancel = CancellationToken::new();
        let worker = worker.spawn(cancel.clone());

        Self {
            queue,
            events,
            transport,
            stats,
            cancel,
            worker,
        }
    }

    fn enqueue(&self, activity: InboundActivity) {
        self.queue.enqueue(activity).unwrap();
    }

    async fn drain(&self) {
        timeout(TEST_TIMEOUT, self.queue.wait_drained())
            .await
            .expect("queue did not drain");
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<Value> {
        self.transport.sent.lock().unwrap().clone()
    }

    async fn stop(self) {
        self.cancel.cancel();
        timeout(TEST_TIMEOUT, self.worker)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}

const MENTION: &str = r#"<span class="h-card" translate="no"><a href="https://bot.test/users/translate" class="u-url mention">@<span>translate</span></a></span>"#;

fn post(n: u32, author: &str, content: &str) -> InboundActivity {
    serde_json::from_value(json!({
        "id": format!("{author}/statuses/{n}/activity"),
        "type": "Create",
        "actor": author,
        "object": {
            "id": format!("{author}/statuses/{n}"),
            "type": "Note",
            "attributedTo": author,
            "content": content,
            "to": ["https://www.w3.org/ns/activitystreams#Public"],
        }
    }))
    .unwrap()
}

fn mention(n: u32, author: &str, text: &str) -> InboundActivity {
    post(n, author, &format!("<p>{MENTION} {text}</p>"))
}

const ANA: &str = "https://remote.test/users/ana";

// ── Properties ──────────────────────────────────────────────────────────

#[tokio::test]
async fn unmentioned_posts_cause_no_calls() {
    let harness = Harness::start();
    harness.enqueue(post(1, ANA, "<p>Bonjour tout le monde</p>"));
    harness.enqueue(post(
        2,
        ANA,
        r#"<p><a href="https://other.test/users/translate" class="u-url mention">@translate</a> hi</p>"#,
    ));
    harness.drain().await;

    assert!(harness.events().is_empty());
    assert_eq!(harness.stats.snapshot().completed, 2);
    harness.stop().await;
}

#[tokio::test]
async fn bare_mention_is_not_translated() {
    let harness = Harness::start();
    harness.enqueue(post(1, ANA, &format!("<p>{MENTION}</p>")));
    harness.enqueue(post(2, ANA, &format!("<p>{MENTION} &nbsp; </p>")));
    harness.drain().await;

    assert!(harness.events().is_empty());
    harness.stop().await;
}

#[tokio::test]
async fn mention_gets_translated_reply() {
    let harness = Harness::start();
    harness.enqueue(mention(7, ANA, "Bonjour tout le monde"));
    harness.drain().await;

    assert_eq!(
        harness.events(),
        vec![
            "translate:Bonjour tout le monde".to_string(),
            format!("deliver:{ANA}/inbox"),
        ]
    );

    let sent = harness.sent();
    assert_eq!(sent.len(), 1);
    let reply = &sent[0];
    let content = reply["object"]["content"].as_str().unwrap();
    assert!(content.contains("Olá a todos"));
    assert!(content.to_uppercase().contains("[FR → PT]"));
    assert_eq!(reply["object"]["inReplyTo"]["id"], format!("{ANA}/statuses/7"));
    assert!(
        reply["object"]["to"]
            .as_array()
            .unwrap()
            .contains(&json!(ANA))
    );
    assert_eq!(reply["object"]["tag"][0]["name"], "@ana@remote.test");
    assert_eq!(reply["actor"], "https://bot.test/users/translate");
    harness.stop().await;
}

#[tokio::test]
async fn translation_failure_does_not_stop_worker() {
    let harness = Harness::start();
    harness.enqueue(mention(1, ANA, "boom"));
    harness.enqueue(mention(2, ANA, "second"));
    harness.drain().await;

    assert_eq!(
        harness.events(),
        vec![
            "translate:boom".to_string(),
            "translate:second".to_string(),
            format!("deliver:{ANA}/inbox"),
        ]
    );
    let snap = harness.stats.snapshot();
    assert_eq!(snap.failed, 1);
    assert_eq!(snap.completed, 1);
    assert_eq!(harness.sent().len(), 1);
    harness.stop().await;
}

#[tokio::test]
async fn delivery_failure_does_not_stop_worker() {
    let harness = Harness::start();
    let down = "https://down.test/users/bea";
    harness.enqueue(mention(1, down, "first"));
    harness.enqueue(mention(2, ANA, "second"));
    harness.drain().await;

    assert_eq!(
        harness.events(),
        vec![
            "translate:first".to_string(),
            format!("deliver:{down}/inbox"),
            "translate:second".to_string(),
            format!("deliver:{ANA}/inbox"),
        ]
    );
    let snap = harness.stats.snapshot();
    assert_eq!(snap.failed, 0);
    assert_eq!(snap.undelivered, 1);
    assert_eq!(snap.completed, 2);
    harness.stop().await;
}

#[tokio::test]
async fn slow_item_finishes_before_fast_item() {
    let harness = Harness::start();
    harness.enqueue(mention(1, ANA, "slow one"));
    harness.enqueue(mention(2, ANA, "fast one"));
    harness.drain().await;

    assert_eq!(
        harness.events(),
        vec![
            "translate:slow one".to_string(),
            format!("deliver:{ANA}/inbox"),
            "translate:fast one".to_string(),
            format!("deliver:{ANA}/inbox"),
        ]
    );
    let sent = harness.sent();
    assert_eq!(sent[0]["object"]["inReplyTo"]["id"], format!("{ANA}/statuses/1"));
    assert_eq!(sent[1]["object"]["inReplyTo"]["id"], format!("{ANA}/statuses/2"));
    harness.stop().await;
}

#[tokio::test]
async fn bot_does_not_answer_itself() {
    let harness = Harness::start();
    harness.enqueue(mention(1, "https://bot.test/users/translate", "echo"));
    harness.drain().await;

    assert!(harness.events().is_empty());
    harness.stop().await;
}
