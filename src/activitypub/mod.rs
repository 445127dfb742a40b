//! ActivityPub plumbing: wire shapes, the bot's identity, keys, signing, and
//! the outbound HTTP client.

pub mod actor;
pub mod client;
pub mod keys;
pub mod signature;
pub mod types;

pub use actor::{BotIdentity, Person};
pub use client::{ActorResolver, HttpFederationClient, Transport, TransportResponse};
pub use keys::{ActorKey, FileKeyStore, KeyKind, KeyStore, PrivateKey};
pub use signature::SigningScheme;
pub use types::{ActorRecord, InboundActivity, InboundPost, PUBLIC_COLLECTION};
