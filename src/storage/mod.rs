pub mod engine;
pub mod snapshot;
pub mod store;

pub use engine::{MemoryStore, StoreSnapshot};
pub use snapshot::{SnapshotError, SnapshotManager, SnapshotMetadata, SnapshotWorker};
pub use store::{NodeCounts, Store, StoreError};
