use std::io::{self, IsTerminal};
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use mmchat::commands::ask::{self, AskArgs};
use mmchat::commands::chat::{self, ChatArgs};
use mmchat::commands::check::{self, CheckArgs};
use mmchat::commands::config::{self, ConfigArgs};
use mmchat::commands::models::{self, ModelsArgs};
use tracing_subscriber::EnvFilter;

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  mmchat chat\n  mmchat chat --model gemini-2.5-flash --image-format jpeg\n  mmchat ask --image cat.png \"What breed is this?\"\n  echo \"2+2?\" | mmchat ask --json\n  mmchat models\n  mmchat completion bash > ~/.local/share/bash-completion/completions/mmchat";

const ASK_HELP_EXAMPLES: &str = "Examples:\n  mmchat ask \"Explain ownership in one paragraph\"\n  mmchat ask --image photo.jpg\n  mmchat ask --image photo.jpg --dry-run \"What is in this picture?\"";

#[derive(Debug, Parser)]
#[command(
    name = "mmchat",
    about = "Chat with text and images using Google Gemini",
    version = env!("MM_LONG_VERSION"),
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[arg(long, global = true, help = "Log provider calls to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Start an interactive chat session")]
    Chat(ChatArgs),
    #[command(about = "Ask a single question, optionally about an image", after_help = ASK_HELP_EXAMPLES)]
    Ask(AskArgs),
    #[command(about = "List models that support generateContent")]
    Models(ModelsArgs),
    #[command(about = "Verify the API key and provider connection")]
    Check(CheckArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "mmchat", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "mmchat", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "mmchat", &mut io::stdout()),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "mmchat=debug" } else { "mmchat=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MM_LOG").unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Chat(args) => chat::run(args).await,
        Commands::Ask(args) => ask::run(args).await,
        Commands::Models(args) => models::run(args).await,
        Commands::Check(args) => check::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
