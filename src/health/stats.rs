use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::{NodeCounts, Store, StoreError};

/// Fleet-wide fault counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_nodes: usize,
    #[serde(rename = "active_faults_count")]
    pub faulty_count: usize,
    /// Share of faulty nodes in percent, two decimals; 0 for an empty fleet
    #[serde(rename = "fault_percentage")]
    pub faulty_percentage: f64,
}

impl From<NodeCounts> for StatsSnapshot {
    fn from(counts: NodeCounts) -> Self {
        let faulty_percentage = if counts.total == 0 {
            0.0
        } else {
            let raw = counts.faulty as f64 / counts.total as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };

        Self {
            total_nodes: counts.total,
            faulty_count: counts.faulty,
            faulty_percentage,
        }
    }
}

/// Derives stats from current node state; holds nothing itself
pub struct StatsAggregator {
    store: Arc<dyn Store>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn compute(&self) -> Result<StatsSnapshot, StoreError> {
        Ok(self.store.node_counts()?.into())
    }
}
