//! `traffic-sync run [--duration-secs N]`

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::cli::commands::connect_store;
use crate::cli::output::{output, summary_line, CommandOutput};
use crate::domain::models::{Config, NetworkSummary};
use crate::services::TrafficRuntime;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    pub duration_secs: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    pub completed_ticks: u64,
    pub skipped_ticks: u64,
    pub live_map_polls: u64,
    pub admin_polls: u64,
    pub version: Option<u64>,
    pub summary: NetworkSummary,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let version = self
            .version
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        [
            format!(
                "Stopped after {} tick(s) ({} skipped)",
                self.completed_ticks, self.skipped_ticks
            ),
            format!(
                "Viewer polls: live map {}, admin {}",
                self.live_map_polls, self.admin_polls
            ),
            format!("Last observed version {version}"),
            summary_line(&self.summary),
        ]
        .join("\n")
    }
}

pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let handle = TrafficRuntime::new(store, config).start();

    let mut live_map = handle.live_map();
    let reporter = tokio::spawn(async move {
        while live_map.changed().await.is_ok() {
            let state = live_map.borrow_and_update().clone();
            let summary = state.summary();
            tracing::info!(
                viewer = "live-map",
                version = state.version,
                clear = summary.clear,
                moderate = summary.moderate,
                congested = summary.congested,
                manual = summary.manual,
                "{}",
                summary_line(&summary)
            );
        }
    });

    handle
        .wait_for_shutdown(args.duration_secs.map(Duration::from_secs))
        .await;

    let status = handle.engine_status().await;
    let live_map = handle.live_map().borrow().clone();
    let admin = handle.admin().borrow().clone();
    handle.stop().await;
    reporter.abort();

    let out = RunOutput {
        completed_ticks: status.completed_ticks,
        skipped_ticks: status.skipped_ticks,
        live_map_polls: live_map.polls,
        admin_polls: admin.polls,
        version: admin.version,
        summary: admin.summary(),
    };
    output(&out, json_mode);
    Ok(())
}
