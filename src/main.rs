//! traffic-sync CLI entry point.

use anyhow::Context;
use clap::Parser;

use traffic_sync::cli::{self, Cli, Commands};
use traffic_sync::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli::load_config(cli.config.as_deref())?;
    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Init(args) => cli::commands::init::execute(args, &config, cli.json).await,
        Commands::Junctions(args) => cli::commands::junctions::execute(args, &config, cli.json).await,
        Commands::Override(args) => cli::commands::override_cmd::execute(args, &config, cli.json).await,
        Commands::Simulate(args) => cli::commands::simulate::execute(args, &config, cli.json).await,
        Commands::Run(args) => cli::commands::run::execute(args, &config, cli.json).await,
        Commands::Reset(args) => cli::commands::reset::execute(args, &config, cli.json).await,
    }
}
