//! Command-line interface.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "traffic-sync")]
#[command(about = "Shared traffic-junction state with AI simulation and operator overrides", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .traffic-sync/
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default config and seed the junction store
    Init(commands::init::InitArgs),
    /// Inspect junctions in the shared store
    Junctions(commands::junctions::JunctionsArgs),
    /// Issue an operator override on one junction
    Override(commands::override_cmd::OverrideArgs),
    /// Run simulation ticks immediately
    Simulate(commands::simulate::SimulateArgs),
    /// Run the engine and both viewers until interrupted
    Run(commands::run::RunArgs),
    /// Overwrite the store with the seed network
    Reset(commands::reset::ResetArgs),
}

/// Load configuration from `path` when given, otherwise from the project hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print `err` and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1);
}
