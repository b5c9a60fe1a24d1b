use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use skywatch::commands;
use skywatch::config::{self, Config};

#[derive(Parser)]
#[command(name = "skywatch", version, about = "Home aircraft spotter and proximity notifier")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the position feed and notify on close approaches.
    Run,
    /// Print summary statistics from the sighting log.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    skywatch::logging::init();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(config::config_path);
    let config = Config::load(&path)?;

    match cli.command {
        Command::Run => {
            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received; finishing up");
                    signal_token.cancel();
                }
            });
            commands::run::handle_run(config, shutdown).await
        }
        Command::Stats => commands::stats::handle_stats(config).await,
    }
}
