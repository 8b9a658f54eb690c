//! Restoration ordering
//!
//! `effective_priority = priority / max(floor, demand / threshold)`
//!
//! Lower is more urgent. An overloaded service (ratio > 1) moves ahead of
//! its static rank; an idle one is clamped at the floor rather than
//! sinking towards infinity. Sorting is stable, so equal scores keep
//! registry order and the result depends only on the inputs.

use crate::registry::{ServiceDescriptor, ServiceRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratio floor used when no policy overrides it
pub const DEFAULT_DEMAND_RATIO_FLOOR: f64 = 0.1;

/// Demand readings for one orchestration run
///
/// Services without a reading count as zero demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandSnapshot {
    samples: IndexMap<String, f64>,
}

impl DemandSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, service_id: S, demand: f64) {
        self.samples.insert(service_id.into(), demand);
    }

    pub fn with<S: Into<String>>(mut self, service_id: S, demand: f64) -> Self {
        self.insert(service_id, demand);
        self
    }

    pub fn get(&self, service_id: &str) -> f64 {
        self.samples.get(service_id).copied().unwrap_or(0.0)
    }

    pub fn samples(&self) -> &IndexMap<String, f64> {
        &self.samples
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for DemandSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// How much of an artifact a restore applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    Partial,
    Full,
}

impl RestoreMode {
    /// `Partial` while demand stays under `threshold * partial_factor`.
    ///
    /// Moderate overload gets the smaller restore and severe overload gets
    /// the full one. Demand below the threshold also lands on partial.
    pub fn select(current_demand: f64, demand_threshold: f64, partial_factor: f64) -> Self {
        if current_demand < demand_threshold * partial_factor {
            RestoreMode::Partial
        } else {
            RestoreMode::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreMode::Partial => "partial",
            RestoreMode::Full => "full",
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `max(floor, current / threshold)`; a non-finite ratio collapses to the floor
pub fn demand_ratio(current_demand: f64, demand_threshold: f64, floor: f64) -> f64 {
    let ratio = current_demand / demand_threshold;
    if ratio.is_finite() {
        ratio.max(floor)
    } else {
        floor
    }
}

pub fn effective_priority(service: &ServiceDescriptor, current_demand: f64, floor: f64) -> f64 {
    service.priority as f64 / demand_ratio(current_demand, service.demand_threshold, floor)
}

/// A service with its computed urgency for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedService {
    pub id: String,
    pub priority: u32,
    pub demand_threshold: f64,
    pub current_demand: f64,
    pub demand_ratio: f64,
    pub effective_priority: f64,
}

impl RankedService {
    /// Demand at or above threshold
    pub fn is_overloaded(&self) -> bool {
        self.current_demand >= self.demand_threshold
    }
}

/// Rank every registered service, most urgent first
pub fn rank_services(
    registry: &ServiceRegistry,
    demand: &DemandSnapshot,
    floor: f64,
) -> Vec<RankedService> {
    let mut ranked: Vec<RankedService> = registry
        .iter()
        .map(|service| {
            let current_demand = demand.get(&service.id);
            let ratio = demand_ratio(current_demand, service.demand_threshold, floor);
            RankedService {
                id: service.id.clone(),
                priority: service.priority,
                demand_threshold: service.demand_threshold,
                current_demand,
                demand_ratio: ratio,
                effective_priority: service.priority as f64 / ratio,
            }
        })
        .collect();

    // sort_by is stable: ties keep registry order
    ranked.sort_by(|a, b| a.effective_priority.total_cmp(&b.effective_priority));
    ranked
}

/// Service ids in restoration order
pub fn compute_priority_order(registry: &ServiceRegistry, demand: &DemandSnapshot) -> Vec<String> {
    rank_services(registry, demand, DEFAULT_DEMAND_RATIO_FLOOR)
        .into_iter()
        .map(|s| s.id)
        .collect()
}
