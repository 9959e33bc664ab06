//! `traffic-sync junctions` subcommands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::commands::connect_store;
use crate::cli::output::{
    junction_detail, junction_table, output, summary_line, supports_color, CommandOutput,
};
use crate::domain::models::{Config, FlowStatus, Junction, JunctionId, NetworkSummary};

#[derive(Args, Debug)]
pub struct JunctionsArgs {
    #[command(subcommand)]
    pub command: JunctionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum JunctionsCommand {
    /// List junctions with the network summary
    List {
        /// Only junctions with this status (clear, moderate, congested)
        #[arg(short, long)]
        status: Option<String>,

        /// Only junctions under manual control
        #[arg(short, long)]
        manual: bool,
    },
    /// Show one junction
    Show {
        /// Junction ID
        id: JunctionId,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct JunctionListOutput {
    pub version: u64,
    pub summary: NetworkSummary,
    pub junctions: Vec<Junction>,
}

impl CommandOutput for JunctionListOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            summary_line(&self.summary),
            format!("Store version {}", self.version),
        ];
        if self.junctions.is_empty() {
            lines.push("No junctions match.".to_string());
        } else {
            lines.push(junction_table(&self.junctions, supports_color()));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct JunctionShowOutput {
    pub version: u64,
    pub junction: Junction,
}

impl CommandOutput for JunctionShowOutput {
    fn to_human(&self) -> String {
        format!("{}\n  Version:     {}", junction_detail(&self.junction), self.version)
    }
}

pub async fn execute(args: JunctionsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let loaded = store.load().await.context("Failed to load junctions")?;

    match args.command {
        JunctionsCommand::List { status, manual } => {
            let status = status
                .map(|s| {
                    FlowStatus::from_str(&s)
                        .ok_or_else(|| anyhow::anyhow!("Invalid status: {s}. Must be one of: clear, moderate, congested"))
                })
                .transpose()?;

            let summary = loaded.snapshot.summary();
            let junctions = loaded
                .snapshot
                .junctions
                .into_iter()
                .filter(|j| status.map_or(true, |s| j.status == s))
                .filter(|j| !manual || j.is_manual)
                .collect();

            let out = JunctionListOutput {
                version: loaded.version,
                summary,
                junctions,
            };
            output(&out, json_mode);
        }
        JunctionsCommand::Show { id } => {
            let Some(junction) = loaded.snapshot.get(id).cloned() else {
                bail!("Unknown junction: {id}");
            };
            let out = JunctionShowOutput {
                version: loaded.version,
                junction,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
