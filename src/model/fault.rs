use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::node::NodeId;

/// Accepted range for fault confidence scores (percent)
pub const CONFIDENCE_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// An immutable fault report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub id: i64,
    pub node_id: NodeId,
    pub description: String,
    pub confidence: f64,
    pub image_url: Option<String>,
    pub reported_at: DateTime<Utc>,
}

/// A fault report before the store assigns its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewFault {
    pub node_id: NodeId,
    pub description: String,
    pub confidence: f64,
    pub image_url: Option<String>,
}

impl NewFault {
    pub fn new(node_id: NodeId, description: impl Into<String>, confidence: f64) -> Self {
        Self {
            node_id,
            description: description.into(),
            confidence,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Confidence lies in [0, 100]. NaN is rejected.
    pub fn has_valid_confidence(&self) -> bool {
        CONFIDENCE_RANGE.contains(&self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        assert!(NewFault::new(1, "x", 0.0).has_valid_confidence());
        assert!(NewFault::new(1, "x", 100.0).has_valid_confidence());
        assert!(NewFault::new(1, "x", 87.5).has_valid_confidence());
        assert!(!NewFault::new(1, "x", -0.01).has_valid_confidence());
        assert!(!NewFault::new(1, "x", 100.01).has_valid_confidence());
        assert!(!NewFault::new(1, "x", f64::NAN).has_valid_confidence());
    }
}
