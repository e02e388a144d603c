//! Errors surfaced to callers of the monitoring core
//!
//! Only validation and missing-node conditions are meant for the caller.
//! Failures on the notification path never reach this type.

use crate::model::NodeId;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Node {0} not found")]
    NotFound(NodeId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MonitorError {
    pub fn validation(message: impl Into<String>) -> Self {
        MonitorError::Validation(message.into())
    }
}
