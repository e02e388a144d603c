//! The monitoring core behind the HTTP surface
//!
//! [`Monitor`] wires the registries, fault ledger, stats and dispatcher over
//! one shared store. State transitions complete before any alert is sent,
//! and alert failures never change the outcome of a call.

use std::sync::Arc;
use std::time::Duration;

use crate::alerts::{AlertChannel, AlertDispatcher};
use crate::error::MonitorError;
use crate::faults::FaultLedger;
use crate::health::{StalenessDetector, StatsAggregator, StatsSnapshot};
use crate::model::{Device, Fault, NewFault, Node, NodeId, NodeStatus, Role};
use crate::registry::{DeviceRegistry, NodeRegistry};
use crate::storage::Store;

pub struct Monitor {
    store: Arc<dyn Store>,
    devices: Arc<DeviceRegistry>,
    nodes: Arc<NodeRegistry>,
    ledger: FaultLedger,
    stats: StatsAggregator,
    dispatcher: Arc<AlertDispatcher>,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn Store>,
        push: Arc<dyn AlertChannel>,
        email: Arc<dyn AlertChannel>,
        channel_timeout: Duration,
    ) -> Self {
        let devices = Arc::new(DeviceRegistry::new(Arc::clone(&store)));
        let nodes = Arc::new(NodeRegistry::new(Arc::clone(&store)));
        let ledger = FaultLedger::new(Arc::clone(&store), Arc::clone(&nodes));
        let stats = StatsAggregator::new(Arc::clone(&store));
        let dispatcher = Arc::new(
            AlertDispatcher::new(Arc::clone(&devices), push, email).with_timeout(channel_timeout),
        );

        Self {
            store,
            devices,
            nodes,
            ledger,
            stats,
            dispatcher,
        }
    }

    /// Register a notification device; idempotent on the token
    pub fn register_device(&self, token: &str, role: Role) -> Result<Device, MonitorError> {
        self.devices.register(token, role)
    }

    pub fn list_nodes(&self) -> Result<Vec<Node>, MonitorError> {
        Ok(self.nodes.list_all()?)
    }

    /// Upsert a node's status and, when both coordinates are given, its location
    pub fn update_node(
        &self,
        id: NodeId,
        status: NodeStatus,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Node, MonitorError> {
        let node = self.nodes.upsert_status(id, status, latitude, longitude)?;
        tracing::info!(
            node_id = id,
            status = %node.status,
            latitude = node.latitude,
            longitude = node.longitude,
            "Node updated"
        );
        Ok(node)
    }

    /// Record a fault, mark its node faulty, then alert staff.
    ///
    /// The fault and the status change are committed before dispatch starts;
    /// a failed or slow alert does not fail the report.
    pub async fn report_fault(&self, report: NewFault) -> Result<Fault, MonitorError> {
        let fault = self.ledger.report(report)?;
        self.dispatcher
            .notify(fault.node_id, fault.confidence)
            .await;
        Ok(fault)
    }

    pub fn list_faults(&self) -> Result<Vec<Fault>, MonitorError> {
        Ok(self.ledger.list_all()?)
    }

    pub fn get_stats(&self) -> Result<StatsSnapshot, MonitorError> {
        Ok(self.stats.compute()?)
    }

    /// Insert the sample nodes when the fleet is empty
    pub fn seed_sample_nodes(&self) -> Result<usize, MonitorError> {
        Ok(self.nodes.seed_sample_nodes()?)
    }

    /// Build a staleness detector sharing this monitor's store and dispatcher
    pub fn staleness_detector(&self, max_age: Duration, check_interval: Duration) -> StalenessDetector {
        StalenessDetector::new(
            Arc::clone(&self.store),
            Arc::clone(&self.nodes),
            Arc::clone(&self.dispatcher),
            max_age,
            check_interval,
        )
    }
}
