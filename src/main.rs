use anyhow::Result;
use clap::Parser;

mod cli;

use event_gateway::{config, init_tracing, server};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Serve => {
            let cfg = config::load_config(&args.config)?;
            init_tracing(&cfg.server);
            server::start_server(cfg).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => {
                let cfg = config::load_config(&args.config)?;
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            }
            cli::ConfigCommands::Validate => {
                config::load_config(&args.config)?;
                println!("Configuration OK: {}", args.config.display());
            }
        },
    }

    Ok(())
}
