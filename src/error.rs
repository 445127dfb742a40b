//! Error types for the translate bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Federation error: {0}")]
    Federation(#[from] FederationError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Translation backend errors.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Translation request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Translation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from translation backend: {reason}")]
    InvalidResponse { reason: String },
}

/// Remote actor resolution and delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("Failed to resolve actor {actor}: {reason}")]
    ResolveFailed { actor: String, reason: String },

    #[error("Actor {actor} returned status {status}")]
    ResolveStatus { actor: String, status: u16 },

    #[error("Invalid actor document for {actor}: {reason}")]
    InvalidActor { actor: String, reason: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to send to {inbox}: {reason}")]
    SendFailed { inbox: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),
}

/// Key loading and request signing errors.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Failed to read key file {path}: {reason}")]
    KeyFile { path: String, reason: String },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Key {key_id} cannot sign with {scheme}")]
    UnsupportedKey { key_id: String, scheme: String },

    #[error("Signature creation failed: {0}")]
    SignFailed(String),
}

/// Per-item processing faults surfaced to the worker loop.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Translation failed: {0}")]
    Translate(#[from] TranslateError),

    #[error("Author resolution failed: {0}")]
    Federation(#[from] FederationError),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Ingestion queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Inbox queue is closed")]
    Closed,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
