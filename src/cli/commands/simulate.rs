//! `traffic-sync simulate [--ticks N]`

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::connect_store;
use crate::cli::output::{output, summary_line, CommandOutput};
use crate::domain::models::{Config, NetworkSummary};
use crate::services::{SimulationConfig, SimulationEngine, TickReport};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of ticks to run back to back
    #[arg(short, long, default_value = "1")]
    pub ticks: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct SimulateOutput {
    pub ticks: Vec<TickReport>,
    pub skipped: u64,
    pub version: u64,
    pub summary: NetworkSummary,
}

impl CommandOutput for SimulateOutput {
    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .ticks
            .iter()
            .map(|t| {
                format!(
                    "tick {:>3}: version {} ({} advanced, {} manual)",
                    t.tick_number, t.version, t.advanced, t.manual_skipped
                )
            })
            .collect();
        if self.skipped > 0 {
            lines.push(format!("{} tick(s) skipped, see log", self.skipped));
        }
        lines.push(summary_line(&self.summary));
        lines.join("\n")
    }
}

pub async fn execute(args: SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let engine = SimulationEngine::new(store.clone(), SimulationConfig::from(&config.simulation));

    let mut ticks = Vec::with_capacity(args.ticks as usize);
    for _ in 0..args.ticks {
        // A failed tick is logged by the engine and counted below.
        if let Ok(report) = engine.tick().await {
            ticks.push(report);
        }
    }

    let status = engine.status().await;
    let latest = store.load().await.context("Failed to load junctions")?;

    let out = SimulateOutput {
        ticks,
        skipped: status.skipped_ticks,
        version: latest.version,
        summary: latest.snapshot.summary(),
    };
    output(&out, json_mode);
    Ok(())
}
