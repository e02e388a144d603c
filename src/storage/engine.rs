use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use super::store::{NodeCounts, Store, StoreError};
use crate::model::{Device, Fault, NewFault, Node, NodeId, NodeStatus, Role};

/// Snapshot format version written by [`MemoryStore::snapshot`]
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// In-memory store backed by concurrent maps.
///
/// Node mutations run while holding the map shard's write lock, which gives
/// per-node atomic read-modify-write. Faults are append-only.
pub struct MemoryStore {
    /// Devices keyed by notification token
    devices: DashMap<String, Device>,
    nodes: DashMap<NodeId, Node>,
    faults: RwLock<Vec<Fault>>,
    next_device_id: AtomicI64,
    next_fault_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            nodes: DashMap::new(),
            faults: RwLock::new(Vec::new()),
            next_device_id: AtomicI64::new(1),
            next_fault_id: AtomicI64::new(1),
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Faults whose node is missing from the snapshot are dropped.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let max_device = snapshot.devices.iter().map(|d| d.id).max().unwrap_or(0);
        let max_fault = snapshot.faults.iter().map(|f| f.id).max().unwrap_or(0);

        let nodes: DashMap<NodeId, Node> = snapshot
            .nodes
            .into_iter()
            .map(|node| (node.id, node))
            .collect();

        let (faults, orphans): (Vec<Fault>, Vec<Fault>) = snapshot
            .faults
            .into_iter()
            .partition(|f| nodes.contains_key(&f.node_id));
        for fault in &orphans {
            tracing::warn!(
                fault_id = fault.id,
                node_id = fault.node_id,
                "Dropping snapshot fault for missing node"
            );
        }

        let store = Self {
            devices: DashMap::new(),
            nodes,
            faults: RwLock::new(faults),
            next_device_id: AtomicI64::new(snapshot.next_device_id.max(max_device + 1)),
            next_fault_id: AtomicI64::new(snapshot.next_fault_id.max(max_fault + 1)),
        };

        for device in snapshot.devices {
            store
                .devices
                .insert(device.notification_token.clone(), device);
        }

        store
    }

    /// Copy the current contents into a serializable snapshot
    pub fn snapshot(&self) -> StoreSnapshot {
        // Faults are read before nodes. Nodes are never deleted, so every
        // fault's node is present in the later node scan.
        let faults = self.faults.read().clone();
        let next_fault_id = self.next_fault_id.load(Ordering::SeqCst);

        let mut devices: Vec<Device> = self.devices.iter().map(|e| e.value().clone()).collect();
        devices.sort_by_key(|d| d.id);

        let mut nodes: Vec<Node> = self.nodes.iter().map(|e| e.value().clone()).collect();
        nodes.sort_by_key(|n| n.id);

        StoreSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            devices,
            nodes,
            faults,
            next_device_id: self.next_device_id.load(Ordering::SeqCst),
            next_fault_id,
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn fault_count(&self) -> usize {
        self.faults.read().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn upsert_device(
        &self,
        token: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Device, StoreError> {
        let device = self
            .devices
            .entry(token.to_string())
            .and_modify(|d| d.role = role)
            .or_insert_with(|| Device {
                id: self.next_device_id.fetch_add(1, Ordering::SeqCst),
                notification_token: token.to_string(),
                role,
                created_at: now,
            });

        Ok(device.value().clone())
    }

    fn devices_with_role(&self, role: Role) -> Result<Vec<Device>, StoreError> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|e| e.value().role == role)
            .map(|e| e.value().clone())
            .collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }

    fn get_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.nodes.get(&id).map(|n| n.value().clone()))
    }

    fn insert_node_if_absent(&self, node: Node) -> Result<bool, StoreError> {
        match self.nodes.entry(node.id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(node);
                Ok(true)
            }
        }
    }

    fn modify_node(
        &self,
        id: NodeId,
        apply: &mut dyn FnMut(Option<&Node>) -> Option<Node>,
    ) -> Result<Option<Node>, StoreError> {
        // The entry guard holds the shard write lock until it drops
        match self.nodes.entry(id) {
            Entry::Occupied(mut slot) => match apply(Some(slot.get())) {
                Some(mut updated) => {
                    updated.id = id;
                    slot.insert(updated.clone());
                    Ok(Some(updated))
                }
                None => Ok(None),
            },
            Entry::Vacant(slot) => match apply(None) {
                Some(mut created) => {
                    created.id = id;
                    slot.insert(created.clone());
                    Ok(Some(created))
                }
                None => Ok(None),
            },
        }
    }

    fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.nodes.iter().map(|e| e.value().clone()).collect())
    }

    fn stale_node_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<NodeId>, StoreError> {
        Ok(self
            .nodes
            .iter()
            .filter(|e| e.value().is_stale(cutoff))
            .map(|e| *e.key())
            .collect())
    }

    fn node_counts(&self) -> Result<NodeCounts, StoreError> {
        let mut counts = NodeCounts::default();
        for entry in self.nodes.iter() {
            counts.total += 1;
            if entry.value().status.is_faulty() {
                counts.faulty += 1;
            }
        }
        Ok(counts)
    }

    fn record_fault(&self, fault: NewFault, now: DateTime<Utc>) -> Result<Fault, StoreError> {
        // The entry guard keeps the node's shard locked until both writes are done
        let mut slot = match self.nodes.entry(fault.node_id) {
            Entry::Occupied(slot) => slot,
            Entry::Vacant(_) => return Err(StoreError::ForeignKey(fault.node_id)),
        };

        let node = slot.get_mut();
        node.status = NodeStatus::Faulty;
        node.last_updated = now;

        let record = Fault {
            id: self.next_fault_id.fetch_add(1, Ordering::SeqCst),
            node_id: fault.node_id,
            description: fault.description,
            confidence: fault.confidence,
            image_url: fault.image_url,
            reported_at: now,
        };

        self.faults.write().push(record.clone());
        Ok(record)
    }

    fn list_faults(&self) -> Result<Vec<Fault>, StoreError> {
        Ok(self.faults.read().clone())
    }
}

/// Serializable image of a [`MemoryStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub devices: Vec<Device>,
    pub nodes: Vec<Node>,
    pub faults: Vec<Fault>,
    pub next_device_id: i64,
    pub next_fault_id: i64,
}
