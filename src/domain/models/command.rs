//! Operator commands accepted by the override controller.

use serde::{Deserialize, Serialize};

use super::junction::JunctionId;

/// What an operator wants done to a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideAction {
    /// Hand the junction back to the simulation
    ReleaseAi,
    /// Ramp flow to 100 over the clear duration while holding manual ownership
    TimedClear,
    /// Force flow to 10 and status to congested immediately
    InstantBlock,
}

impl OverrideAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReleaseAi => "release-ai",
            Self::TimedClear => "timed-clear",
            Self::InstantBlock => "instant-block",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "release-ai" | "ai" | "release" => Some(Self::ReleaseAi),
            "timed-clear" | "clear" | "force-green" => Some(Self::TimedClear),
            "instant-block" | "block" | "force-red" => Some(Self::InstantBlock),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverrideAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command targeting one junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub junction_id: JunctionId,
    pub action: OverrideAction,
}

impl Command {
    pub const fn new(junction_id: JunctionId, action: OverrideAction) -> Self {
        Self { junction_id, action }
    }

    pub const fn release_ai(junction_id: JunctionId) -> Self {
        Self::new(junction_id, OverrideAction::ReleaseAi)
    }

    pub const fn timed_clear(junction_id: JunctionId) -> Self {
        Self::new(junction_id, OverrideAction::TimedClear)
    }

    pub const fn instant_block(junction_id: JunctionId) -> Self {
        Self::new(junction_id, OverrideAction::InstantBlock)
    }
}
