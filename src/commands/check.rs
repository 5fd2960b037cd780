use std::env;

use clap::Args;

use crate::commands::{ProviderArgs, connect};
use crate::genai::payload::{self, ImageFormat};
use crate::genai::provider::{API_KEY_ENV, PLACEHOLDER_API_KEY};
use crate::genai::response;

const CHECK_PROMPT: &str = "Say 'Hello, I'm working!' in one sentence";

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// Verifies the key is configured and the model answers a short prompt.
pub async fn run(args: CheckArgs) -> Result<(), String> {
    let configured = env::var(API_KEY_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .is_some_and(|value| !value.is_empty() && value != PLACEHOLDER_API_KEY);
    if !configured {
        return Err(format!(
            "API key not configured. Set {API_KEY_ENV} in the environment or .env file."
        ));
    }
    println!("ok: API key found");

    let (settings, transport) = connect(&args.provider)?;
    let request = payload::build(CHECK_PROMPT, None, ImageFormat::default())
        .map_err(|err| response::format_error(&err))?;
    let reply = transport
        .send(&request)
        .await
        .and_then(|body| response::reply_text(&body))
        .map_err(|err| format!("AI connection failed: {err}"))?;

    println!("ok: {} replied: {reply}", settings.model);
    println!("Setup is complete. Run `mmchat chat` to start chatting.");
    Ok(())
}
