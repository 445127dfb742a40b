//! Google Cloud Translation (v2 REST) backend.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::provider::{TranslationResult, Translator};
use crate::config::TranslateConfig;
use crate::error::TranslateError;

/// Translator backed by the Google Translation v2 API.
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    target_language: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranslateError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            target_language: config.target_language.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: ApiData,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    translations: Vec<ApiTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTranslation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn default_target(&self) -> &str {
        &self.target_language
    }

    async fn translate(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> Result<TranslationResult, TranslateError> {
        let target = target.unwrap_or(self.target_language.as_str());

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&serde_json::json!({
                "q": text,
                "target": target,
                "format": "text",
            }))
            .send()
            .await
            .map_err(|e| TranslateError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| TranslateError::InvalidResponse {
                reason: e.to_string(),
            })?;

        let first = parsed.data.translations.into_iter().next().ok_or_else(|| {
            TranslateError::InvalidResponse {
                reason: "no translations in response".to_string(),
            }
        })?;

        debug!(
            target = %target,
            source = ?first.detected_source_language,
            "Translation completed"
        );

        Ok(TranslationResult {
            translated_text: first.translated_text,
            detected_source_language: first.detected_source_language,
        })
    }
}
