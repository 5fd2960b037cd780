use clap::Args;

use crate::config::{Overrides, Settings};
use crate::genai::provider;
use crate::genai::transport::{ProviderSettings, Transport};

pub mod ask;
pub mod chat;
pub mod check;
pub mod config;
pub mod models;

/// Provider options shared by every command that talks to the API.
#[derive(Debug, Args, Clone, Default)]
pub struct ProviderArgs {
    #[arg(long, help = "Profile name from the config file")]
    pub profile: Option<String>,
    #[arg(long, help = "Model identifier, e.g. gemini-2.5-flash")]
    pub model: Option<String>,
    #[arg(long, help = "Provider base URL")]
    pub base_url: Option<String>,
    #[arg(long, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
    #[arg(long, help = "Retries on 429/5xx and connection failures")]
    pub retries: Option<u32>,
    #[arg(long, help = "Base retry delay in milliseconds")]
    pub retry_delay: Option<u64>,
    #[arg(long, help = "Format images are re-encoded to: png or jpeg")]
    pub image_format: Option<String>,
}

impl ProviderArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
            image_format: self.image_format.clone(),
        }
    }

    pub fn settings(&self) -> Result<Settings, String> {
        crate::config::resolve(&self.overrides())
    }
}

/// Resolves settings and the API key into a ready transport.
pub(crate) fn connect(args: &ProviderArgs) -> Result<(Settings, Transport), String> {
    let settings = args.settings()?;
    let api_key = provider::api_key_from_env().map_err(|err| err.to_string())?;
    let transport = Transport::new(ProviderSettings {
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
        api_key,
        retry: settings.retry(),
    });
    Ok((settings, transport))
}
