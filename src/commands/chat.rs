use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use clap::Args;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::commands::{ProviderArgs, connect};
use crate::genai::conversation::{Role, TurnContent};
use crate::genai::session::ChatSession;

pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image";

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplOptions {
    pub color: bool,
}

/// One parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Clear,
    History,
    Image { path: String, prompt: String },
    Text(String),
    Blank,
}

pub fn parse_line(line: &str) -> ReplCommand {
    let input = line.trim();
    if input.is_empty() {
        return ReplCommand::Blank;
    }
    if input.eq_ignore_ascii_case("quit") {
        return ReplCommand::Quit;
    }
    if input == "clear" {
        return ReplCommand::Clear;
    }
    if input == "history" {
        return ReplCommand::History;
    }
    if let Some(rest) = input.strip_prefix("image ") {
        let (path, prompt) = match rest.split_once(' ') {
            Some((path, prompt)) => (path, prompt),
            None => (rest, DEFAULT_IMAGE_PROMPT),
        };
        return ReplCommand::Image {
            path: path.to_string(),
            prompt: prompt.to_string(),
        };
    }
    ReplCommand::Text(input.to_string())
}

pub async fn run(args: ChatArgs) -> Result<(), String> {
    let (settings, transport) = connect(&args.provider)?;
    let mut session = ChatSession::new(transport, settings.image_format);
    let stdout = io::stdout();
    let options = ReplOptions {
        color: stdout.is_terminal(),
    };
    run_repl(&mut session, io::stdin().lock(), stdout.lock(), options).await
}

/// Reads commands from `input` until `quit` or EOF, one provider call at a time.
pub async fn run_repl<R, W>(
    session: &mut ChatSession,
    mut input: R,
    mut output: W,
    options: ReplOptions,
) -> Result<(), String>
where
    R: BufRead,
    W: Write,
{
    let title = "Multi-Modal Chatbot CLI";
    if options.color {
        writeln!(output, "{}", title.bold()).map_err(write_error)?;
    } else {
        writeln!(output, "{title}").map_err(write_error)?;
    }
    writeln!(
        output,
        "Model: {}\nCommands:\n- Type 'image <path> [prompt]' to analyze an image\n- Type 'history' to show the conversation\n- Type 'clear' to start over\n- Type 'quit' to exit\n{}",
        session.model(),
        "-".repeat(50)
    )
    .map_err(write_error)?;

    loop {
        write!(output, "\n{} ", user_label(options)).map_err(write_error)?;
        output.flush().map_err(write_error)?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|err| format!("Failed to read input: {err}"))?;
        if read == 0 {
            writeln!(output, "\nGoodbye!").map_err(write_error)?;
            return Ok(());
        }

        match parse_line(&line) {
            ReplCommand::Blank => {}
            ReplCommand::Quit => {
                writeln!(output, "Goodbye!").map_err(write_error)?;
                return Ok(());
            }
            ReplCommand::Clear => {
                session.clear();
                writeln!(output, "Conversation cleared.").map_err(write_error)?;
            }
            ReplCommand::History => render_history(session, &mut output, options)?,
            ReplCommand::Image { path, prompt } => {
                let bytes = match read_image(Path::new(&path)) {
                    Ok(bytes) => bytes,
                    Err(message) => {
                        writeln!(output, "{message}").map_err(write_error)?;
                        continue;
                    }
                };
                debug!(path = %path, bytes = bytes.len(), "loaded image");
                let reply = session.submit(&prompt, Some(bytes.as_slice())).await;
                writeln!(output, "\n{} {reply}", bot_label(options)).map_err(write_error)?;
            }
            ReplCommand::Text(prompt) => {
                let reply = session.submit(&prompt, None).await;
                writeln!(output, "\n{} {reply}", bot_label(options)).map_err(write_error)?;
            }
        }
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>, String> {
    if !path.exists() {
        return Err(format!("Error: Image file '{}' not found", path.display()));
    }
    fs::read(path).map_err(|err| format!("Error: Failed to read image '{}': {err}", path.display()))
}

fn render_history<W: Write>(
    session: &ChatSession,
    output: &mut W,
    options: ReplOptions,
) -> Result<(), String> {
    let turns = session.conversation().all();
    if turns.is_empty() {
        return writeln!(output, "(no messages yet)").map_err(write_error);
    }
    for turn in turns {
        let label = match turn.role() {
            Role::User => user_label(options),
            Role::Assistant => bot_label(options),
        };
        let written = match turn.content() {
            TurnContent::Text(text) => writeln!(output, "{label} {text}"),
            TurnContent::Image(bytes) => writeln!(output, "{label} [image, {} bytes]", bytes.len()),
        };
        written.map_err(write_error)?;
    }
    Ok(())
}

fn user_label(options: ReplOptions) -> String {
    if options.color {
        "You:".cyan().bold().to_string()
    } else {
        "You:".to_string()
    }
}

fn bot_label(options: ReplOptions) -> String {
    if options.color {
        "Bot:".green().bold().to_string()
    } else {
        "Bot:".to_string()
    }
}

fn write_error(err: io::Error) -> String {
    format!("Failed to write output: {err}")
}
