//! Fault ledger
//!
//! Recording a fault and flipping its node to faulty form one unit, committed
//! by a single store operation. Alerting is left to the caller, which
//! dispatches once the ledger has returned the persisted fault.

use chrono::Utc;
use std::cmp::Reverse;
use std::sync::Arc;

use crate::error::MonitorError;
use crate::model::{Fault, NewFault, CONFIDENCE_RANGE};
use crate::registry::NodeRegistry;
use crate::storage::{Store, StoreError};

pub struct FaultLedger {
    store: Arc<dyn Store>,
    nodes: Arc<NodeRegistry>,
}

impl FaultLedger {
    pub fn new(store: Arc<dyn Store>, nodes: Arc<NodeRegistry>) -> Self {
        Self { store, nodes }
    }

    /// Record a fault report against an existing node and mark the node faulty
    pub fn report(&self, report: NewFault) -> Result<Fault, MonitorError> {
        if !report.has_valid_confidence() {
            return Err(MonitorError::validation(format!(
                "confidence must be between {} and {}, got {}",
                CONFIDENCE_RANGE.start(),
                CONFIDENCE_RANGE.end(),
                report.confidence
            )));
        }

        let node_id = report.node_id;
        if self.nodes.get(node_id)?.is_none() {
            return Err(MonitorError::NotFound(node_id));
        }

        // Fault insert and node status change commit together
        let fault = self
            .store
            .record_fault(report, Utc::now())
            .map_err(|e| match e {
                StoreError::ForeignKey(id) => MonitorError::NotFound(id),
                other => MonitorError::Store(other),
            })?;

        tracing::info!(
            fault_id = fault.id,
            node_id = fault.node_id,
            confidence = fault.confidence,
            "Fault recorded"
        );
        Ok(fault)
    }

    /// All faults, newest first; ties broken by id descending
    pub fn list_all(&self) -> Result<Vec<Fault>, StoreError> {
        let mut faults = self.store.list_faults()?;
        faults.sort_by_key(|f| (Reverse(f.reported_at), Reverse(f.id)));
        Ok(faults)
    }
}
