//! `traffic-sync override <id> <action>`

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::connect_store;
use crate::cli::output::{junction_detail, output, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{Command, Config, Junction, JunctionId, OverrideAction};
use crate::services::{AnimationOutcome, AnimationReport, OverrideConfig, OverrideController};

#[derive(Args, Debug)]
pub struct OverrideArgs {
    /// Junction ID
    pub junction_id: JunctionId,

    /// release-ai (ai), timed-clear (clear) or instant-block (block)
    #[arg(value_parser = parse_action)]
    pub action: OverrideAction,

    /// Return after the first write of a timed clear instead of waiting for the ramp
    #[arg(long)]
    pub no_wait: bool,
}

fn parse_action(s: &str) -> Result<OverrideAction, String> {
    OverrideAction::from_str(s).ok_or_else(|| {
        format!("unknown action '{s}', expected one of: release-ai, timed-clear, instant-block")
    })
}

#[derive(Debug, serde::Serialize)]
pub struct OverrideOutput {
    pub command: Command,
    pub version: u64,
    pub junction: Junction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationReport>,
}

impl CommandOutput for OverrideOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "{} applied to junction {} (version {})",
                self.command.action, self.command.junction_id, self.version
            ),
            junction_detail(&self.junction),
        ];
        if let Some(report) = &self.animation {
            let outcome = match &report.outcome {
                AnimationOutcome::Completed => "completed".to_string(),
                AnimationOutcome::Cancelled => "cancelled".to_string(),
                AnimationOutcome::Aborted { reason } => format!("aborted: {reason}"),
            };
            lines.push(format!(
                "Timed clear {outcome} after {} steps: flow {}% -> {}%",
                report.steps_committed, report.start_flow, report.final_flow
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: OverrideArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let controller = OverrideController::new(store.clone(), OverrideConfig::from(&config.overrides));
    let command = Command::new(args.junction_id, args.action);

    let outcome = match controller.execute(command).await {
        Ok(outcome) => outcome,
        Err(DomainError::UnknownJunction(id)) => {
            anyhow::bail!("Command rejected: unknown junction {id}");
        }
        Err(e) => return Err(e).context("Override command failed"),
    };

    let mut junction = outcome.junction;
    let mut version = outcome.version;
    let animation = match outcome.animation {
        Some(handle) if !args.no_wait => {
            let report = handle.wait().await;
            // Show what the store holds now, not the phase 1 record.
            let latest = store.load().await.context("Failed to reload junction")?;
            if let Some(current) = latest.snapshot.get(args.junction_id) {
                junction = current.clone();
                version = latest.version;
            }
            Some(report)
        }
        _ => None,
    };

    let out = OverrideOutput {
        command,
        version,
        junction,
        animation,
    };
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_aliases() {
        assert_eq!(parse_action("block"), Ok(OverrideAction::InstantBlock));
        assert_eq!(parse_action("Timed-Clear"), Ok(OverrideAction::TimedClear));
        assert!(parse_action("reverse").unwrap_err().contains("release-ai"));
    }
}
