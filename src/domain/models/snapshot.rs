//! Traffic snapshot: the unit of read and write against the junction store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::junction::{FlowStatus, Junction, JunctionId, MAX_FLOW};
use super::seed::seed_junction_ids;
use crate::domain::errors::{DomainError, DomainResult};

/// The complete ordered set of junctions at one instant.
///
/// Serializes as a bare JSON array, the same shape the shared store has
/// always held.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficSnapshot {
    pub junctions: Vec<Junction>,
}

impl TrafficSnapshot {
    pub fn new(junctions: Vec<Junction>) -> Self {
        Self { junctions }
    }

    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    pub fn get(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JunctionId) -> Option<&mut Junction> {
        self.junctions.iter_mut().find(|j| j.id == id)
    }

    /// Like [`get_mut`](Self::get_mut) but reports a missing id as `UnknownJunction`.
    pub fn require_mut(&mut self, id: JunctionId) -> DomainResult<&mut Junction> {
        self.get_mut(id).ok_or(DomainError::UnknownJunction(id))
    }

    pub fn contains(&self, id: JunctionId) -> bool {
        self.get(id).is_some()
    }

    /// Parse a stored payload, rejecting anything that breaks the data model.
    pub fn from_json(payload: &str) -> DomainResult<Self> {
        let snapshot: Self = serde_json::from_str(payload)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string(self).map_err(|e| DomainError::ValidationFailed(e.to_string()))
    }

    /// Check flow range, id uniqueness, and that the ids are exactly the seed network's.
    pub fn validate(&self) -> DomainResult<()> {
        let mut seen = HashSet::with_capacity(self.junctions.len());
        for junction in &self.junctions {
            if junction.flow > MAX_FLOW {
                return Err(DomainError::MalformedSnapshot(format!(
                    "junction {} has flow {} outside 0-{MAX_FLOW}",
                    junction.id, junction.flow
                )));
            }
            if !seen.insert(junction.id) {
                return Err(DomainError::MalformedSnapshot(format!(
                    "duplicate junction id {}",
                    junction.id
                )));
            }
        }

        let missing: Vec<JunctionId> = seed_junction_ids().filter(|id| !seen.remove(id)).collect();
        if !missing.is_empty() {
            return Err(DomainError::MalformedSnapshot(format!(
                "missing junction ids {missing:?}"
            )));
        }
        if let Some(&extra) = seen.iter().min() {
            return Err(DomainError::MalformedSnapshot(format!(
                "junction id {extra} is not part of the network"
            )));
        }
        Ok(())
    }

    /// Aggregate counts for headers and dashboards.
    pub fn summary(&self) -> NetworkSummary {
        let mut summary = NetworkSummary {
            total: self.junctions.len(),
            ..NetworkSummary::default()
        };
        let mut flow_sum = 0u32;
        for junction in &self.junctions {
            match junction.status {
                FlowStatus::Clear => summary.clear += 1,
                FlowStatus::Moderate => summary.moderate += 1,
                FlowStatus::Congested => summary.congested += 1,
            }
            if junction.is_manual {
                summary.manual += 1;
            }
            flow_sum += u32::from(junction.flow);
        }
        if summary.total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean = f64::from(flow_sum) / summary.total as f64;
            summary.mean_flow = mean;
        }
        summary
    }
}

/// A snapshot together with the store version it was read at.
///
/// Version `0` means nothing has been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedSnapshot {
    pub version: u64,
    pub snapshot: TrafficSnapshot,
}

impl VersionedSnapshot {
    pub fn new(version: u64, snapshot: TrafficSnapshot) -> Self {
        Self { version, snapshot }
    }
}

/// Derived counts over a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub total: usize,
    pub clear: usize,
    pub moderate: usize,
    pub congested: usize,
    pub manual: usize,
    pub mean_flow: f64,
}

impl NetworkSummary {
    pub fn ai_controlled(&self) -> usize {
        self.total - self.manual
    }
}
