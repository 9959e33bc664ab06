//! `traffic-sync reset`

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::connect_store;
use crate::cli::output::{output, summary_line, CommandOutput};
use crate::domain::models::{seed_snapshot, Config, NetworkSummary};

#[derive(Args, Debug)]
pub struct ResetArgs {}

#[derive(Debug, serde::Serialize)]
pub struct ResetOutput {
    pub version: u64,
    pub summary: NetworkSummary,
}

impl CommandOutput for ResetOutput {
    fn to_human(&self) -> String {
        format!(
            "Store reset to the seed network at version {}\n{}",
            self.version,
            summary_line(&self.summary)
        )
    }
}

pub async fn execute(_args: ResetArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let version = store.reset().await.context("Failed to reset junction store")?;
    tracing::warn!(version, "junction store reset to seed");

    let out = ResetOutput {
        version,
        summary: seed_snapshot().summary(),
    };
    output(&out, json_mode);
    Ok(())
}
