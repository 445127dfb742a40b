//! Translation port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Shown in place of a source language the backend did not detect.
pub const UNKNOWN_LANGUAGE: &str = "?";

/// Outcome of a single translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub detected_source_language: Option<String>,
}

impl TranslationResult {
    /// Detected source language, or [`UNKNOWN_LANGUAGE`].
    pub fn source_language(&self) -> &str {
        match self.detected_source_language.as_deref() {
            Some(lang) if !lang.is_empty() => lang,
            _ => UNKNOWN_LANGUAGE,
        }
    }
}

/// A text-in, text-out translation backend.
///
/// Implementations do not retry; a failure is returned to the caller as is.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Target language used when no override is given.
    fn default_target(&self) -> &str;

    /// Translate `text` into `target`, or into [`Translator::default_target`].
    async fn translate(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> Result<TranslationResult, TranslateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_uses_sentinel() {
        let result = TranslationResult {
            translated_text: "Olá".into(),
            detected_source_language: None,
        };
        assert_eq!(result.source_language(), "?");

        let empty = TranslationResult {
            detected_source_language: Some(String::new()),
            ..result.clone()
        };
        assert_eq!(empty.source_language(), "?");

        let fr = TranslationResult {
            detected_source_language: Some("fr".into()),
            ..result
        };
        assert_eq!(fr.source_language(), "fr");
    }
}
