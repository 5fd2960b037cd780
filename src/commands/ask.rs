use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use tracing::{debug, info};

use crate::commands::{ProviderArgs, connect};
use crate::genai::payload::{self, Request};
use crate::genai::provider;
use crate::genai::response;

/// Prompt used when an image is given without any text.
pub const ANALYZE_IMAGE_PROMPT: &str = "Describe this image in detail. What do you see?";

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,
    #[arg(long, value_name = "PATH", help = "Attach an image (png, jpg, gif, bmp, ...)")]
    pub image: Option<PathBuf>,
    #[arg(long, help = "Print the request instead of sending it")]
    pub dry_run: bool,
    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,
    #[arg(help = "Prompt text; read from stdin when omitted")]
    pub prompt: Option<String>,
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    // A missing key must stop us before any input is read.
    let connection = if args.dry_run {
        None
    } else {
        Some(connect(&args.provider)?)
    };

    let image = match &args.image {
        Some(path) => Some(fs::read(path).map_err(|err| {
            format!("Failed to read image '{}': {err}", path.display())
        })?),
        None => None,
    };
    let prompt = resolve_prompt(args.prompt.as_deref(), image.is_some())?;

    let Some((settings, transport)) = connection else {
        let settings = args.provider.settings()?;
        let request = payload::build(&prompt, image.as_deref(), settings.image_format)
            .map_err(|err| response::format_error(&err))?;
        debug!(
            model = %settings.model,
            api_key_present = provider::is_api_key_present(),
            "dry run, request not sent"
        );
        return print_dry_run(&settings, &request);
    };

    let request = payload::build(&prompt, image.as_deref(), settings.image_format)
        .map_err(|err| response::format_error(&err))?;
    info!(model = %settings.model, "asking");

    let reply = transport
        .send(&request)
        .await
        .and_then(|body| response::reply_text(&body))
        .map_err(|err| response::format_error(&err))?;

    if args.json {
        println!("{}", json!({ "model": settings.model, "reply": reply }));
    } else {
        println!("{reply}");
    }
    Ok(())
}

fn resolve_prompt(argument: Option<&str>, has_image: bool) -> Result<String, String> {
    let prompt = match argument {
        Some(prompt) => prompt.to_string(),
        None => read_stdin_prompt()?,
    };
    if !prompt.trim().is_empty() {
        return Ok(prompt);
    }
    if has_image {
        return Ok(ANALYZE_IMAGE_PROMPT.to_string());
    }
    Err("No prompt provided. Pass it as an argument or pipe it on stdin.".to_string())
}

fn read_stdin_prompt() -> Result<String, String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}

fn print_dry_run(settings: &crate::config::Settings, request: &Request) -> Result<(), String> {
    let payload = request
        .to_json()
        .map_err(|err| format!("Failed to serialize request: {err}"))?;
    let body = json!({
        "dry_run": true,
        "model": settings.model,
        "endpoint": provider::generate_content_url(&settings.base_url, &settings.model),
        "api_key_present": provider::is_api_key_present(),
        "image_format": settings.image_format.as_str(),
        "retry": {
            "timeout_secs": settings.timeout_secs,
            "retries": settings.retries,
            "retry_delay_ms": settings.retry_delay_ms,
        },
        "request": payload,
    });
    println!("{body}");
    Ok(())
}
