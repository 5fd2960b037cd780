use clap::Args;

use crate::commands::{ProviderArgs, connect};
use crate::genai::response;

#[derive(Debug, Args, Clone)]
pub struct ModelsArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,
}

pub async fn run(args: ModelsArgs) -> Result<(), String> {
    let (_, transport) = connect(&args.provider)?;
    let models = transport
        .list_models()
        .await
        .map_err(|err| response::format_error(&err))?;

    println!("Available models:");
    for model in models {
        println!("- {}", model.name);
    }
    Ok(())
}
