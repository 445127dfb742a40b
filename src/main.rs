use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use translate_bot::activitypub::keys::{load_public_key_pem, select_key};
use translate_bot::activitypub::{
    BotIdentity, FileKeyStore, HttpFederationClient, KeyStore, Person, SigningScheme,
};
use translate_bot::config::BotConfig;
use translate_bot::pipeline::{DeliveryAttempter, InboxWorker, MentionProcessor, inbox_queue};
use translate_bot::server::{AppState, app_routes};
use translate_bot::translate::{GoogleTranslator, Translator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = BotConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let identity = BotIdentity::from_profile(&config.profile);

    // ── Keys ─────────────────────────────────────────────────────────────
    let (public_key_pem, keys) = load_keys(&config, &identity).await?;

    // ── Pipeline ─────────────────────────────────────────────────────────
    let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(&config.translate)?);
    let federation = Arc::new(HttpFederationClient::new(format!(
        "translate-bot/{} (+{})",
        env!("CARGO_PKG_VERSION"),
        identity.actor_url()
    ))?);
    let delivery = DeliveryAttempter::new(
        federation.clone(),
        keys,
        federation,
        identity.clone(),
    );
    let processor = Arc::new(MentionProcessor::new(
        identity.clone(),
        translator,
        delivery,
    ));

    let (queue, receiver) = inbox_queue();
    let worker = InboxWorker::new(receiver, processor, config.queue_poll_interval);
    let cancel = CancellationToken::new();
    let worker_handle = worker.spawn(cancel.clone());

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = app_routes(AppState {
        identity: identity.clone(),
        profile: config.profile.clone(),
        person: Arc::new(Person::for_bot(&identity, &config.profile, public_key_pem)),
        queue: queue.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        actor = %identity.actor_url(),
        handle = %identity.handle(),
        target = %config.translate.target_language,
        "Translate bot v{} started",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // ── Shutdown ─────────────────────────────────────────────────────────
    cancel.cancel();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Inbox worker task failed");
    }
    let dropped = queue.pending();
    if dropped > 0 {
        tracing::warn!(dropped, "Shutting down with unprocessed inbox items");
    }
    tracing::info!("Translate bot stopped");
    Ok(())
}

/// Read the public key for the actor document and check the private key.
///
/// Fails fast on an unreadable private key; delivery re-reads it per reply.
async fn load_keys(
    config: &BotConfig,
    identity: &BotIdentity,
) -> translate_bot::error::Result<(String, Arc<dyn KeyStore>)> {
    let public_key_pem = load_public_key_pem(&config.public_key_path).await?;
    let keys: Arc<dyn KeyStore> = Arc::new(FileKeyStore::new(
        identity.clone(),
        &config.private_key_path,
    ));

    let startup_keys = keys.signing_keys(identity.username()).await?;
    if select_key(startup_keys, SigningScheme::DraftCavage.key_kind()).is_none() {
        tracing::warn!(
            path = %config.private_key_path.display(),
            "Private key is not RSA, replies cannot be signed"
        );
    }
    Ok((public_key_pem, keys))
}

/// Stderr logging, plus a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "translate-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
