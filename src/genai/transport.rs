use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::genai::payload::Request;
use crate::genai::provider::{self, ProviderError};
use crate::genai::response::{GenerateContentResponse, ModelInfo, ModelList, ProviderResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

const MAX_BACKOFF_MS: u64 = 30_000;

impl RetryConfig {
    /// Whether another attempt is allowed after `attempt` (zero-based) failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.retries
    }

    /// Wait before the attempt following `attempt`: the base delay doubled
    /// per attempt, capped at 30s.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(20);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            retries: 0,
            retry_delay_ms: 500,
        }
    }
}

/// Where and how to reach the provider. The key is kept out of `Debug`.
#[derive(Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

/// HTTP client bound to one provider endpoint and model.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    settings: ProviderSettings,
}

impl Transport {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn endpoint(&self) -> String {
        provider::generate_content_url(&self.settings.base_url, &self.settings.model)
    }

    /// Sends one `generateContent` call. Failures come back as values.
    pub async fn send(&self, request: &Request) -> ProviderResult {
        let url = self.endpoint();
        let payload = request.to_payload();
        debug!(
            url = %url,
            has_image = request.image.is_some(),
            prompt_chars = request.prompt.chars().count(),
            "sending generateContent request"
        );

        let response = self
            .execute(|| self.client.post(&url).json(&payload))
            .await?;
        let body = response.text().await.map_err(ProviderError::Transport)?;
        serde_json::from_str::<GenerateContentResponse>(&body)
            .map_err(|err| ProviderError::malformed(format!("invalid JSON body: {err}")))
    }

    /// Models that accept `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = provider::models_url(&self.settings.base_url);
        debug!(url = %url, "listing models");

        let response = self.execute(|| self.client.get(&url)).await?;
        let body = response.text().await.map_err(ProviderError::Transport)?;
        let list: ModelList = serde_json::from_str(&body)
            .map_err(|err| ProviderError::malformed(format!("invalid JSON body: {err}")))?;
        Ok(list
            .models
            .into_iter()
            .filter(ModelInfo::supports_generate_content)
            .collect())
    }

    async fn execute<F>(&self, make_request: F) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let retry = self.settings.retry;
        let mut attempt = 0;
        loop {
            match self.attempt(make_request()).await {
                Err(err) if err.is_retryable() && retry.allows_retry(attempt) => {
                    warn!(error = %err, attempt, "retrying provider call");
                    sleep(retry.backoff(attempt)).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn attempt(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = request.query(&[("key", self.settings.api_key.as_str())]);
        if let Some(timeout_secs) = self.settings.retry.timeout_secs {
            request = request.timeout(Duration::from_secs(timeout_secs));
        }

        // reqwest embeds the URL, which carries the key.
        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Transport(source.without_url()))?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry(retries: u32, retry_delay_ms: u64) -> RetryConfig {
        RetryConfig {
            timeout_secs: None,
            retries,
            retry_delay_ms,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = retry(3, 250);
        assert_eq!(config.backoff(0), Duration::from_millis(250));
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(3), Duration::from_millis(2_000));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(retry(1, 500).backoff(12), Duration::from_millis(30_000));
        assert_eq!(retry(1, 1).backoff(64), Duration::from_millis(30_000));
    }

    #[test]
    fn retries_are_bounded_by_config() {
        assert!(!RetryConfig::default().allows_retry(0));
        let config = retry(2, 1);
        assert!(config.allows_retry(0));
        assert!(config.allows_retry(1));
        assert!(!config.allows_retry(2));
    }

    #[test]
    fn settings_debug_hides_the_key() {
        let settings = ProviderSettings {
            base_url: provider::DEFAULT_BASE_URL.to_string(),
            model: provider::DEFAULT_MODEL.to_string(),
            api_key: "super-secret".to_string(),
            retry: RetryConfig::default(),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
