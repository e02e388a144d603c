//! JSON snapshot persistence for the in-memory store
//!
//! A snapshot is written to a temporary sibling file and renamed over the
//! target, so a crash mid-write leaves the previous snapshot intact. Saves
//! through one manager (and its clones) never overlap.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time;

use super::engine::{MemoryStore, StoreSnapshot, SNAPSHOT_SCHEMA_VERSION};

/// Summary of a written snapshot
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub devices: usize,
    pub nodes: usize,
    pub faults: usize,
}

/// Reads and writes store snapshots at a fixed path
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
    /// Held across write + rename of the shared temp file
    save_lock: Arc<Mutex<()>>,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store's current contents
    pub fn save(&self, store: &MemoryStore) -> Result<SnapshotMetadata, SnapshotError> {
        let snapshot = store.snapshot();
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let _guard = self.save_lock.lock();
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(SnapshotMetadata {
            path: self.path.clone(),
            size_bytes: data.len(),
            devices: snapshot.devices.len(),
            nodes: snapshot.nodes.len(),
            faults: snapshot.faults.len(),
        })
    }

    /// Load a store from the snapshot file, `None` if there is none yet
    pub fn load(&self) -> Result<Option<MemoryStore>, SnapshotError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: StoreSnapshot = serde_json::from_slice(&data)
            .map_err(|e| SnapshotError::Deserialization(e.to_string()))?;

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.schema_version));
        }

        Ok(Some(MemoryStore::from_snapshot(snapshot)))
    }
}

/// Background worker that periodically saves a snapshot
pub struct SnapshotWorker {
    store: Arc<MemoryStore>,
    manager: SnapshotManager,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown: Notify,
}

impl SnapshotWorker {
    pub fn new(store: Arc<MemoryStore>, manager: SnapshotManager, interval: Duration) -> Self {
        Self {
            store,
            manager,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Notify::new(),
        }
    }

    /// Start the background worker.
    ///
    /// The task ends promptly after [`SnapshotWorker::stop`], finishing any
    /// save already in progress first.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!(
                path = %self.manager.path().display(),
                "Snapshot worker started with interval {:?}",
                self.interval
            );

            let mut interval = time::interval(self.interval);
            // The first tick completes immediately; nothing new to save yet
            interval.tick().await;

            while self.running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = self.shutdown.notified() => break,
                }
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.save_now();
            }

            tracing::info!("Snapshot worker stopped");
        })
    }

    /// Save immediately, logging the outcome
    pub fn save_now(&self) {
        match self.manager.save(&self.store) {
            Ok(meta) => tracing::debug!(
                nodes = meta.nodes,
                faults = meta.faults,
                devices = meta.devices,
                bytes = meta.size_bytes,
                "Snapshot saved"
            ),
            Err(e) => tracing::error!(error = %e, "Snapshot save failed"),
        }
    }

    /// Stop the worker; await its task before a final save
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}
