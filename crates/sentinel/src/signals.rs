//! External signals: live demand per service and the incident flag
//!
//! Both are owned by whoever deploys the engine. The engine only samples
//! them; it never decides how demand is measured or what an incident is.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::RwLock;

/// Source of live demand readings
///
/// A failed sample is not fatal: the orchestrator logs it and treats the
/// service as idle for that run.
#[async_trait]
pub trait DemandSource: Send + Sync {
    async fn sample(&self, service_id: &str) -> anyhow::Result<f64>;
}

/// Answers "is there an incident right now?"
#[async_trait]
pub trait IncidentDetector: Send + Sync {
    async fn detect(&self) -> bool;
}

/// Demand table set by hand; services not in the table read as zero
#[derive(Debug, Default)]
pub struct StaticDemand {
    table: RwLock<IndexMap<String, f64>>,
}

impl StaticDemand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            table: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn set<S: Into<String>>(&self, service_id: S, demand: f64) {
        if let Ok(mut table) = self.table.write() {
            table.insert(service_id.into(), demand);
        }
    }
}

#[async_trait]
impl DemandSource for StaticDemand {
    async fn sample(&self, service_id: &str) -> anyhow::Result<f64> {
        let table = self
            .table
            .read()
            .map_err(|_| anyhow::anyhow!("demand table lock poisoned"))?;
        Ok(table.get(service_id).copied().unwrap_or(0.0))
    }
}

/// Always reports an incident
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysIncident;

#[async_trait]
impl IncidentDetector for AlwaysIncident {
    async fn detect(&self) -> bool {
        true
    }
}

/// Never reports an incident
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverIncident;

#[async_trait]
impl IncidentDetector for NeverIncident {
    async fn detect(&self) -> bool {
        false
    }
}
