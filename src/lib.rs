//! polewatch: fleet health monitoring for fixed-location nodes
//!
//! Nodes report their status over HTTP. Field reports raise faults against a
//! node, and nodes that fall silent are marked faulty by a background
//! staleness detector. Each normal → faulty transition alerts staff devices
//! over push and email.
//!
//! # Features
//!
//! - **Node Registry**: Upsert node status and location atomically per node
//! - **Fault Ledger**: Validated, append-only fault reports tied to nodes
//! - **Staleness Detection**: Periodic heartbeat check with one alert per transition
//! - **Alert Dispatch**: Concurrent push and email fan-out with per-channel timeouts
//! - **Stats**: Fleet size and faulty percentage
//! - **Snapshots**: Optional JSON persistence of the in-memory store
//!
//! # Example
//!
//! ```no_run
//! use polewatch::alerts::DisabledChannel;
//! use polewatch::model::{NewFault, NodeStatus, Role};
//! use polewatch::service::Monitor;
//! use polewatch::storage::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), polewatch::MonitorError> {
//! let monitor = Monitor::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(DisabledChannel::new("push")),
//!     Arc::new(DisabledChannel::new("email")),
//!     Duration::from_secs(5),
//! );
//!
//! monitor.register_device("token-1", Role::Staff)?;
//! monitor.update_node(1, NodeStatus::Normal, Some(12.97), Some(77.59))?;
//! let fault = monitor.report_fault(NewFault::new(1, "leaning pole", 87.5)).await?;
//! println!("Recorded fault {}", fault.id);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod error;
pub mod faults;
pub mod health;
pub mod model;
pub mod registry;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigError, MonitorConfig};
pub use error::MonitorError;
pub use model::{Device, Fault, NewFault, Node, NodeId, NodeStatus, Role};
pub use service::Monitor;
pub use storage::{MemoryStore, Store, StoreError};
