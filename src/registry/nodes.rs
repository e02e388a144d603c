use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::Arc;

use crate::model::{Location, Node, NodeId, NodeStatus};
use crate::storage::{Store, StoreError};

/// Nodes inserted by [`NodeRegistry::seed_sample_nodes`]: (id, latitude, longitude)
pub const SAMPLE_NODES: [(NodeId, f64, f64); 3] = [
    (1, 12.9716, 77.5946),
    (2, 28.7041, 77.1025),
    (3, 19.0760, 72.8777),
];

/// Owns every node state transition.
///
/// Node ids are assigned by the caller (they are the physical device ids), so
/// creation and update collapse into a single upsert.
pub struct NodeRegistry {
    store: Arc<dyn Store>,
}

impl NodeRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create or update a node's status.
    ///
    /// An unknown id is created at the given location, or at (0, 0) when the
    /// coordinate pair is incomplete. A known node always gets the new status
    /// and a fresh `last_updated`; its location only changes when both
    /// coordinates are supplied.
    pub fn upsert_status(
        &self,
        id: NodeId,
        status: NodeStatus,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Node, StoreError> {
        let location = Location::from_parts(latitude, longitude);
        let now = Utc::now();

        let node = self.store.modify_node(id, &mut |current| {
            Some(match current {
                None => Node::new(id, status, location, now),
                Some(existing) => {
                    let mut node = existing.clone();
                    node.status = status;
                    node.last_updated = now;
                    if let Some(location) = location {
                        node.set_location(location);
                    }
                    node
                }
            })
        })?;

        // modify_node always writes when the closure returns Some
        node.ok_or_else(|| StoreError::Unavailable(format!("upsert of node {id} was not applied")))
    }

    /// Mark a node faulty and refresh its timestamp.
    ///
    /// Unknown ids are a no-op and return `None`.
    pub fn force_faulty(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        let now = Utc::now();
        let node = self.store.modify_node(id, &mut |current| {
            let mut node = current?.clone();
            node.status = NodeStatus::Faulty;
            node.last_updated = now;
            Some(node)
        })?;

        if node.is_none() {
            tracing::debug!(node_id = id, "force_faulty on unknown node ignored");
        }
        Ok(node)
    }

    /// Demote a node to faulty if it is still stale at the time of the write.
    ///
    /// The staleness condition is re-checked under the record lock, so a node
    /// that reported in (or was already marked faulty) since it was selected
    /// is left alone and produces no alert.
    pub fn demote_if_stale(
        &self,
        id: NodeId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Node>, StoreError> {
        self.store.modify_node(id, &mut |current| {
            let current = current?;
            if !current.is_stale(cutoff) {
                return None;
            }
            let mut node = current.clone();
            node.status = NodeStatus::Faulty;
            node.last_updated = now;
            Some(node)
        })
    }

    pub fn get(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        self.store.get_node(id)
    }

    /// All nodes, most recently touched first; ties broken by id descending
    pub fn list_all(&self) -> Result<Vec<Node>, StoreError> {
        let mut nodes = self.store.list_nodes()?;
        nodes.sort_by_key(|n| (Reverse(n.last_updated), Reverse(n.id)));
        Ok(nodes)
    }

    /// Insert the sample nodes when the fleet is empty. Returns how many were added.
    pub fn seed_sample_nodes(&self) -> Result<usize, StoreError> {
        if self.store.node_counts()?.total > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let mut inserted = 0;
        for (id, latitude, longitude) in SAMPLE_NODES {
            let node = Node::new(
                id,
                NodeStatus::Normal,
                Some(Location::new(latitude, longitude)),
                now,
            );
            if self.store.insert_node_if_absent(node)? {
                inserted += 1;
            }
        }

        tracing::info!(inserted, "Seeded sample nodes");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn registry() -> (Arc<MemoryStore>, NodeRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = NodeRegistry::new(store.clone());
        (store, registry)
    }

    #[test]
    fn test_upsert_creates_unknown_node_at_origin() {
        let (_store, registry) = registry();

        let node = registry
            .upsert_status(7, NodeStatus::Normal, None, None)
            .unwrap();

        assert_eq!(node.id, 7);
        assert_eq!(node.status, NodeStatus::Normal);
        assert_eq!(node.location(), Location::new(0.0, 0.0));
    }

    #[test]
    fn test_upsert_creates_with_location() {
        let (_store, registry) = registry();

        let node = registry
            .upsert_status(8, NodeStatus::Faulty, Some(10.5), Some(-20.25))
            .unwrap();

        assert_eq!(node.location(), Location::new(10.5, -20.25));
        assert_eq!(node.status, NodeStatus::Faulty);
    }

    #[test]
    fn test_partial_location_is_ignored() {
        let (_store, registry) = registry();
        registry
            .upsert_status(1, NodeStatus::Normal, Some(5.0), Some(6.0))
            .unwrap();

        let node = registry
            .upsert_status(1, NodeStatus::Faulty, Some(99.0), None)
            .unwrap();
        assert_eq!(node.location(), Location::new(5.0, 6.0));
        assert_eq!(node.status, NodeStatus::Faulty);

        let node = registry
            .upsert_status(1, NodeStatus::Normal, None, Some(42.0))
            .unwrap();
        assert_eq!(node.location(), Location::new(5.0, 6.0));
    }

    #[test]
    fn test_lone_latitude_on_create_defaults_to_origin() {
        let (_store, registry) = registry();

        let node = registry
            .upsert_status(3, NodeStatus::Normal, Some(12.0), None)
            .unwrap();
        assert_eq!(node.location(), Location::new(0.0, 0.0));
    }

    #[test]
    fn test_upsert_bumps_last_updated() {
        let (store, registry) = registry();
        let old = Utc::now() - Duration::hours(1);
        store
            .insert_node_if_absent(Node::new(1, NodeStatus::Faulty, None, old))
            .unwrap();

        let node = registry
            .upsert_status(1, NodeStatus::Normal, None, None)
            .unwrap();
        assert!(node.last_updated > old);
        assert_eq!(node.status, NodeStatus::Normal);
    }

    #[test]
    fn test_force_faulty() {
        let (_store, registry) = registry();
        registry
            .upsert_status(4, NodeStatus::Normal, None, None)
            .unwrap();

        let node = registry.force_faulty(4).unwrap().unwrap();
        assert_eq!(node.status, NodeStatus::Faulty);
    }

    #[test]
    fn test_force_faulty_unknown_is_noop() {
        let (store, registry) = registry();

        assert!(registry.force_faulty(404).unwrap().is_none());
        assert_eq!(store.node_counts().unwrap().total, 0);
    }

    #[test]
    fn test_list_all_ordering() {
        let (store, registry) = registry();
        let now = Utc::now();
        let earlier = now - Duration::seconds(10);

        for (id, at) in [(1, earlier), (2, now), (3, now), (4, earlier)] {
            store
                .insert_node_if_absent(Node::new(id, NodeStatus::Normal, None, at))
                .unwrap();
        }

        let ids: Vec<NodeId> = registry.list_all().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_demote_if_stale() {
        let (store, registry) = registry();
        let now = Utc::now();
        let cutoff = now - Duration::seconds(300);

        store
            .insert_node_if_absent(Node::new(
                1,
                NodeStatus::Normal,
                None,
                now - Duration::seconds(301),
            ))
            .unwrap();
        store
            .insert_node_if_absent(Node::new(2, NodeStatus::Normal, None, now))
            .unwrap();

        let demoted = registry.demote_if_stale(1, cutoff, now).unwrap().unwrap();
        assert_eq!(demoted.status, NodeStatus::Faulty);
        assert_eq!(demoted.last_updated, now);

        // Already faulty: nothing to do the second time
        assert!(registry.demote_if_stale(1, cutoff, now).unwrap().is_none());
        // Fresh node is untouched
        assert!(registry.demote_if_stale(2, cutoff, now).unwrap().is_none());
        // Unknown node is untouched
        assert!(registry.demote_if_stale(3, cutoff, now).unwrap().is_none());
    }

    #[test]
    fn test_seed_sample_nodes_only_on_empty_fleet() {
        let (_store, registry) = registry();

        assert_eq!(registry.seed_sample_nodes().unwrap(), 3);
        assert_eq!(registry.seed_sample_nodes().unwrap(), 0);

        let node = registry.get(2).unwrap().unwrap();
        assert_eq!(node.location(), Location::new(28.7041, 77.1025));
    }
}
