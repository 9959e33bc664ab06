//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::env;

use crate::domain::models::{FlowStatus, Junction, NetworkSummary};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Check if color output is supported
pub fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    // Check for dumb terminal
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

const fn status_color(status: FlowStatus) -> Color {
    match status {
        FlowStatus::Clear => Color::Green,
        FlowStatus::Moderate => Color::Yellow,
        FlowStatus::Congested => Color::Red,
    }
}

const fn status_icon(status: FlowStatus) -> &'static str {
    match status {
        FlowStatus::Clear => "●",
        FlowStatus::Moderate => "◐",
        FlowStatus::Congested => "○",
    }
}

/// "Traffic Network (26)" header with per-status counts.
pub fn summary_line(summary: &NetworkSummary) -> String {
    format!(
        "Traffic Network ({}) | clear {} | moderate {} | congested {} | manual {} | mean flow {:.1}%",
        summary.total,
        summary.clear,
        summary.moderate,
        summary.congested,
        summary.manual,
        summary.mean_flow,
    )
}

/// Render junctions as a table.
pub fn junction_table(junctions: &[Junction], use_colors: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Junction").add_attribute(Attribute::Bold),
        Cell::new("Flow").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Control").add_attribute(Attribute::Bold),
    ]);

    for junction in junctions {
        let status_cell = if use_colors {
            Cell::new(junction.status.as_str()).fg(status_color(junction.status))
        } else {
            Cell::new(format!("{} {}", status_icon(junction.status), junction.status))
        };

        let control = if junction.is_manual { "MANUAL" } else { "AI" };
        let control_cell = if use_colors && junction.is_manual {
            Cell::new(control).fg(Color::Magenta).add_attribute(Attribute::Bold)
        } else {
            Cell::new(control)
        };

        table.add_row(vec![
            Cell::new(junction.id),
            Cell::new(&junction.name),
            Cell::new(format!("{}%", junction.flow)),
            status_cell,
            control_cell,
        ]);
    }

    table.to_string()
}

/// Multi-line detail view of one junction.
pub fn junction_detail(junction: &Junction) -> String {
    let control = if junction.is_manual { "manual" } else { "ai" };
    [
        format!("Junction {}: {}", junction.id, junction.name),
        format!("  Coordinates: {:.4}, {:.4}", junction.coords.0, junction.coords.1),
        format!("  Flow:        {}%", junction.flow),
        format!("  Status:      {}", junction.status),
        format!("  Control:     {control}"),
    ]
    .join("\n")
}
