//! Configuration types.
//!
//! Everything is read from `TRANSLATEBOT_*` environment variables. A `.env`
//! file in the working directory is loaded by `main` before parsing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TRANSLATEBOT_";

/// Google Cloud Translation v2 endpoint.
pub const DEFAULT_TRANSLATE_ENDPOINT: &str =
    "https://translation.googleapis.com/language/translate/v2";

/// Identity of the bot on the fediverse.
#[derive(Debug, Clone)]
pub struct BotProfile {
    /// Public host name (no scheme), e.g. `bot.example.org`.
    pub domain: String,
    /// Local username, e.g. `translate`.
    pub username: String,
    pub display_name: String,
    pub summary: String,
}

/// Translation backend settings.
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub api_key: SecretString,
    /// Process-wide default target language.
    pub target_language: String,
    pub endpoint: String,
    pub timeout: Duration,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub profile: BotProfile,
    pub translate: TranslateConfig,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// How long the worker waits on an empty queue before re-polling.
    pub queue_poll_interval: Duration,
    /// Directory for rolling log files. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// `lookup` receives the full variable name including the prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &str| {
            get(name).ok_or_else(|| ConfigError::MissingEnvVar(format!("{ENV_PREFIX}{name}")))
        };

        let domain = require("DOMAIN")?;
        if domain.contains('/') || domain.contains("://") {
            return Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}DOMAIN"),
                message: format!("expected a bare host name, got {domain}"),
            });
        }

        let profile = BotProfile {
            domain,
            username: get("BOT_USERNAME").unwrap_or_else(|| "translate".to_string()),
            display_name: get("BOT_DISPLAY_NAME").unwrap_or_else(|| "Translate Bot".to_string()),
            summary: get("BOT_SUMMARY").unwrap_or_else(|| {
                "Mention me in a post and I will reply with a translation.".to_string()
            }),
        };

        let translate = TranslateConfig {
            api_key: SecretString::from(require("GOOGLE_TRANSLATE_API_KEY")?),
            target_language: require("TARGET_LANGUAGE")?.to_lowercase(),
            endpoint: get("TRANSLATE_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TRANSLATE_ENDPOINT.to_string()),
            timeout: Duration::from_secs(parse_or(&get, "TRANSLATE_TIMEOUT_SECS", 15)?),
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}BIND_ADDR"),
                message: format!("{e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let poll_secs: u64 = parse_or(&get, "QUEUE_POLL_SECS", 5)?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}QUEUE_POLL_SECS"),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            profile,
            translate,
            private_key_path: get("PRIVATE_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("keys/private.pem")),
            public_key_path: get("PUBLIC_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("keys/public.pem")),
            bind_addr,
            queue_poll_interval: Duration::from_secs(poll_secs),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<G>(get: &G, name: &str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{name}"),
            message: format!("expected an unsigned integer, got {raw}"),
        }),
        None => Ok(default),
    }
}
