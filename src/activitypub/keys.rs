//! Signing key material for the bot.
//!
//! The delivery path only ever asks a [`KeyStore`] for the keys of an identity
//! and picks the first one of the kind it can sign with.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use ring::signature::{Ed25519KeyPair, RsaKeyPair};
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;

use super::actor::BotIdentity;
use crate::error::SigningError;

/// Asymmetric key families the bot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    Ed25519,
}

/// A parsed private key.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Arc<RsaKeyPair>),
    Ed25519(Arc<Ed25519KeyPair>),
}

impl PrivateKey {
    /// Parse a PEM private key (PKCS#8 RSA or Ed25519, or PKCS#1 RSA).
    pub fn from_pem(pem: &[u8]) -> Result<Self, SigningError> {
        let der = PrivateKeyDer::from_pem_slice(pem)
            .map_err(|e| SigningError::InvalidKey(format!("unreadable PEM: {e:?}")))?;

        match der {
            PrivateKeyDer::Pkcs8(key) => {
                let bytes = key.secret_pkcs8_der();
                if let Ok(rsa) = RsaKeyPair::from_pkcs8(bytes) {
                    return Ok(Self::Rsa(Arc::new(rsa)));
                }
                Ed25519KeyPair::from_pkcs8_maybe_unchecked(bytes)
                    .map(|k| Self::Ed25519(Arc::new(k)))
                    .map_err(|e| SigningError::InvalidKey(format!("unsupported PKCS#8 key: {e}")))
            }
            PrivateKeyDer::Pkcs1(key) => RsaKeyPair::from_der(key.secret_pkcs1_der())
                .map(|k| Self::Rsa(Arc::new(k)))
                .map_err(|e| SigningError::InvalidKey(format!("invalid RSA key: {e}"))),
            _ => Err(SigningError::InvalidKey("unsupported key encoding".to_string())),
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Rsa(_) => KeyKind::Rsa,
            Self::Ed25519(_) => KeyKind::Ed25519,
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({:?})", self.kind())
    }
}

/// A key published under an actor's key id.
#[derive(Debug, Clone)]
pub struct ActorKey {
    pub key_id: String,
    pub private_key: PrivateKey,
}

/// Lookup of signing keys for a local identity.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Keys for `identity` (a local username). Empty when the identity is unknown.
    async fn signing_keys(&self, identity: &str) -> Result<Vec<ActorKey>, SigningError>;
}

/// First key of the requested kind, if any.
pub fn select_key(keys: Vec<ActorKey>, kind: KeyKind) -> Option<ActorKey> {
    keys.into_iter().find(|k| k.private_key.kind() == kind)
}

/// Key store backed by the bot's PEM file on disk.
///
/// The file is re-read on every lookup so a rotated key is picked up without
/// a restart.
pub struct FileKeyStore {
    identity: BotIdentity,
    private_key_path: PathBuf,
}

impl FileKeyStore {
    pub fn new(identity: BotIdentity, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            private_key_path: private_key_path.into(),
        }
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn signing_keys(&self, identity: &str) -> Result<Vec<ActorKey>, SigningError> {
        if !self.identity.owns_username(identity) {
            return Ok(Vec::new());
        }

        let pem = tokio::fs::read(&self.private_key_path)
            .await
            .map_err(|e| SigningError::KeyFile {
                path: self.private_key_path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(vec![ActorKey {
            key_id: self.identity.key_id(),
            private_key: PrivateKey::from_pem(&pem)?,
        }])
    }
}

/// Read a PEM public key for publishing in the actor document.
pub async fn load_public_key_pem(path: &std::path::Path) -> Result<String, SigningError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SigningError::KeyFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
