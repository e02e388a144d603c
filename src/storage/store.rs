//! The narrow persistence interface the core components talk to.
//!
//! Implementations must make a read-modify-write of a single node atomic:
//! concurrent [`Store::modify_node`] calls on the same id are serialized.

use chrono::{DateTime, Utc};

use crate::model::{Device, Fault, NewFault, Node, NodeId, Role};

/// Node totals used by the stats aggregator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub total: usize,
    pub faulty: usize,
}

/// Persistence for devices, nodes and faults
pub trait Store: Send + Sync {
    /// Insert a device or update the role of the one holding `token`
    fn upsert_device(
        &self,
        token: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Device, StoreError>;

    /// All devices registered with `role`
    fn devices_with_role(&self, role: Role) -> Result<Vec<Device>, StoreError>;

    fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Insert `node` unless its id is taken. Returns whether it was inserted.
    fn insert_node_if_absent(&self, node: Node) -> Result<bool, StoreError>;

    /// Atomically read-modify-write one node record.
    ///
    /// `apply` receives the current record (`None` when the id is unknown) and
    /// returns the record to write, or `None` to leave the store untouched.
    /// Returns the written record.
    fn modify_node(
        &self,
        id: NodeId,
        apply: &mut dyn FnMut(Option<&Node>) -> Option<Node>,
    ) -> Result<Option<Node>, StoreError>;

    /// All nodes, in no particular order
    fn list_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Ids of nodes with `last_updated < cutoff` whose status is not faulty
    fn stale_node_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<NodeId>, StoreError>;

    fn node_counts(&self) -> Result<NodeCounts, StoreError>;

    /// Persist a fault and mark its node faulty as of `now`, as one atomic step.
    ///
    /// Fails with [`StoreError::ForeignKey`] when the node is unknown; nothing
    /// is written in that case.
    fn record_fault(&self, fault: NewFault, now: DateTime<Utc>) -> Result<Fault, StoreError>;

    /// All faults, in no particular order
    fn list_faults(&self) -> Result<Vec<Fault>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Node {0} does not exist")]
    ForeignKey(NodeId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
