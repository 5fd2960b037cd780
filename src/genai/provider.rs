use std::env;
use std::fmt;

use reqwest::StatusCode;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Value shipped in the sample `.env`; treated as "not configured".
pub const PLACEHOLDER_API_KEY: &str = "your_google_api_key_here";

/// `{base}/v1beta/models/{model}:generateContent`, without the key query.
pub fn generate_content_url(base_url: &str, model: &str) -> String {
    let model = model.trim().trim_start_matches("models/");
    format!(
        "{}/v1beta/models/{model}:generateContent",
        base_url.trim_end_matches('/')
    )
}

pub fn models_url(base_url: &str) -> String {
    format!("{}/v1beta/models", base_url.trim_end_matches('/'))
}

pub fn is_api_key_present() -> bool {
    env::var(API_KEY_ENV)
        .ok()
        .is_some_and(|value| !value.trim().is_empty())
}

/// Reads the provider key from the environment. An empty value counts as missing.
pub fn api_key_from_env() -> Result<String, ProviderError> {
    env::var(API_KEY_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ProviderError::MissingApiKey {
            key_env: API_KEY_ENV,
        })
}

#[derive(Debug)]
pub enum ProviderError {
    MissingApiKey { key_env: &'static str },
    Encoding(image::ImageError),
    Transport(reqwest::Error),
    Api { status: StatusCode, body: String },
    MalformedResponse { reason: String },
}

impl ProviderError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Rate limits, server errors and connect/timeout failures may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Transport(source) => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey { key_env } => {
                write!(f, "Please set {key_env} in the environment or .env file")
            }
            Self::Encoding(source) => write!(f, "failed to encode image: {source}"),
            Self::Transport(source) => write!(f, "request failed: {source}"),
            Self::Api { status, body } => write!(f, "{} - {body}", status.as_u16()),
            Self::MalformedResponse { reason } => write!(f, "malformed response: {reason}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encoding(source) => Some(source),
            Self::Transport(source) => Some(source),
            _ => None,
        }
    }
}
