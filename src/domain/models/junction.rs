//! Junction domain model.
//!
//! A junction is a monitored intersection with a throughput percentage
//! (`flow`) and a congestion category (`status`). Ownership decides who may
//! move those values:
//! - AI-owned: the simulation engine walks `flow` and derives `status`
//! - Manual: only operator commands write `flow`/`status`

use serde::{Deserialize, Serialize};

/// Stable identifier of a junction, unique across the network.
pub type JunctionId = u32;

/// Lowest possible flow value.
pub const MIN_FLOW: u8 = 0;

/// Highest possible flow value.
pub const MAX_FLOW: u8 = 100;

/// Flows below this are congested.
pub const CONGESTED_BELOW: u8 = 30;

/// Flows at or above this are clear.
pub const CLEAR_AT: u8 = 60;

/// Flow written by an instant block.
pub const BLOCKED_FLOW: u8 = 10;

/// Flow a timed clear ramps toward.
pub const CLEARED_FLOW: u8 = MAX_FLOW;

/// Congestion category of a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    /// Traffic is moving freely
    Clear,
    /// Traffic is slowed
    Moderate,
    /// Traffic is backed up
    Congested,
}

impl FlowStatus {
    /// Threshold function applied to AI-owned junctions.
    pub const fn from_flow(flow: u8) -> Self {
        if flow < CONGESTED_BELOW {
            Self::Congested
        } else if flow < CLEAR_AT {
            Self::Moderate
        } else {
            Self::Clear
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Moderate => "moderate",
            Self::Congested => "congested",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clear" => Some(Self::Clear),
            "moderate" => Some(Self::Moderate),
            "congested" => Some(Self::Congested),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single junction record.
///
/// Field names on the wire follow the shared browser-store format
/// (`isManual`), so snapshots written by older clients still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    pub name: String,
    /// Latitude, longitude
    pub coords: (f64, f64),
    pub status: FlowStatus,
    pub flow: u8,
    #[serde(rename = "isManual")]
    pub is_manual: bool,
    /// Marks the timed clear that owns this junction, if one does.
    ///
    /// Every other command clears it, so an animation in any process can see
    /// from the stored record alone that it has been superseded.
    #[serde(rename = "clearId", default, skip_serializing_if = "Option::is_none")]
    pub clear_id: Option<u32>,
}

impl Junction {
    /// Create an AI-owned junction whose status follows its flow.
    pub fn new(id: JunctionId, name: impl Into<String>, coords: (f64, f64), flow: u8) -> Self {
        let flow = flow.min(MAX_FLOW);
        Self {
            id,
            name: name.into(),
            coords,
            status: FlowStatus::from_flow(flow),
            flow,
            is_manual: false,
            clear_id: None,
        }
    }

    /// Move flow by `delta`, clamped to [0, 100], and rederive status.
    ///
    /// Manual junctions are left untouched; returns whether anything moved.
    pub fn advance(&mut self, delta: i32) -> bool {
        if self.is_manual {
            return false;
        }
        self.flow = clamp_flow(i32::from(self.flow) + delta);
        self.status = FlowStatus::from_flow(self.flow);
        true
    }

    /// Hand the junction back to the simulation. Flow and status stay as they are.
    pub fn release(&mut self) {
        self.is_manual = false;
        self.clear_id = None;
    }

    /// Take manual ownership for the timed clear `clear_id`, leaving flow and
    /// status as they are.
    pub fn begin_clear(&mut self, clear_id: u32) {
        self.is_manual = true;
        self.clear_id = Some(clear_id);
    }

    /// Force the junction red.
    pub fn block(&mut self) {
        self.is_manual = true;
        self.clear_id = None;
        self.flow = BLOCKED_FLOW;
        self.status = FlowStatus::Congested;
    }

    /// Write one step of the timed clear that owns the junction.
    pub fn force_clear(&mut self, flow: u8) {
        self.is_manual = true;
        self.flow = flow.min(MAX_FLOW);
        self.status = FlowStatus::Clear;
    }

    /// True when an AI-owned junction's status disagrees with its flow.
    pub fn has_stale_status(&self) -> bool {
        !self.is_manual && self.status != FlowStatus::from_flow(self.flow)
    }
}

/// Clamp an arbitrary integer into the flow range.
pub fn clamp_flow(value: i32) -> u8 {
    // Clamped to 0..=100, so the narrowing cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let flow = value.clamp(i32::from(MIN_FLOW), i32::from(MAX_FLOW)) as u8;
    flow
}
