use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned node identity (the physical device id)
pub type NodeId = i64;

/// Health status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Normal,
    Faulty,
}

impl NodeStatus {
    pub fn is_faulty(&self) -> bool {
        matches!(self, NodeStatus::Faulty)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Normal => write!(f, "normal"),
            NodeStatus::Faulty => write!(f, "faulty"),
        }
    }
}

/// Geographic position of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a location only when both coordinates are present.
    ///
    /// A lone latitude or longitude yields `None`.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(Self::new(lat, lon)),
            _ => None,
        }
    }
}

/// A monitored node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
    pub status: NodeStatus,
    pub last_updated: DateTime<Utc>,
}

impl Node {
    /// Create a node; a missing location defaults to (0, 0)
    pub fn new(
        id: NodeId,
        status: NodeStatus,
        location: Option<Location>,
        now: DateTime<Utc>,
    ) -> Self {
        let location = location.unwrap_or_default();
        Self {
            id,
            latitude: location.latitude,
            longitude: location.longitude,
            status,
            last_updated: now,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }

    pub fn set_location(&mut self, location: Location) {
        self.latitude = location.latitude;
        self.longitude = location.longitude;
    }

    /// True when the node has not reported since `cutoff` and is not already faulty
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_updated < cutoff && !self.status.is_faulty()
    }
}
