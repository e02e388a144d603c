//! Device and node registries
//!
//! Both are thin owners of state transitions over the [`Store`](crate::storage::Store);
//! neither keeps any state of its own.

pub mod devices;
pub mod nodes;

pub use devices::DeviceRegistry;
pub use nodes::{NodeRegistry, SAMPLE_NODES};
