//! Floodcast entry point: training pipeline, dashboard server, and
//! single-row prediction from saved artifacts.

use clap::Parser;
use floodcast::cli::{cmd_predict, cmd_run, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floodcast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, data } => {
            cmd_run(&config, data.as_deref())?;
        }
        Commands::Serve { config, host, port } => {
            cmd_serve(&config, host, port).await?;
        }
        Commands::Predict { artifact, input } => {
            cmd_predict(&artifact, &input)?;
        }
    }

    Ok(())
}
