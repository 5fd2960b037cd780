use clap::{Args, Subcommand};

use crate::commands::ProviderArgs;
use crate::config;

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand, Clone)]
enum ConfigSubcommand {
    #[command(about = "Validate the config file")]
    Check {
        #[arg(long)]
        profile: Option<String>,
    },
    #[command(about = "Print the effective settings after CLI, env and profile resolution")]
    Show {
        #[command(flatten)]
        provider: ProviderArgs,
    },
}

pub fn run(args: ConfigArgs) -> Result<(), String> {
    match args.command {
        ConfigSubcommand::Check { profile } => {
            let path = config::validate_config(profile.as_deref())?;
            println!("config OK: {}", path.display());
        }
        ConfigSubcommand::Show { provider } => {
            let settings = provider.settings()?;
            println!("model = {}", settings.model);
            println!("base_url = {}", settings.base_url);
            println!("image_format = {}", settings.image_format.as_str());
            match settings.timeout_secs {
                Some(timeout) => println!("timeout = {timeout}"),
                None => println!("timeout = none"),
            }
            println!("retries = {}", settings.retries);
            println!("retry_delay = {}", settings.retry_delay_ms);
        }
    }
    Ok(())
}
