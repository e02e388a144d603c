//! Background staleness detector

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;

use crate::alerts::AlertDispatcher;
use crate::model::Node;
use crate::registry::NodeRegistry;
use crate::storage::{Store, StoreError};

/// Confidence attached to staleness alerts: a silent node is a total signal loss
pub const STALENESS_CONFIDENCE: f64 = 100.0;

/// Demotes nodes that stopped reporting and alerts on each demotion.
///
/// A node only alerts on its normal → faulty edge. Nodes that are already
/// faulty are skipped, so a node that stays silent is not re-alerted on
/// every tick.
pub struct StalenessDetector {
    scanner: Scanner,
    check_interval: Duration,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
}

#[derive(Clone)]
struct Scanner {
    store: Arc<dyn Store>,
    nodes: Arc<NodeRegistry>,
    dispatcher: Arc<AlertDispatcher>,
    max_age: Duration,
}

impl StalenessDetector {
    pub fn new(
        store: Arc<dyn Store>,
        nodes: Arc<NodeRegistry>,
        dispatcher: Arc<AlertDispatcher>,
        max_age: Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            scanner: Scanner {
                store,
                nodes,
                dispatcher,
                max_age,
            },
            check_interval,
            shutdown_tx: None,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.scanner.max_age
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run one scan as of `now`. Returns the nodes demoted by this scan.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<Node>, StoreError> {
        self.scanner.scan(now).await
    }

    /// Start the background loop.
    ///
    /// A failed tick is logged and the loop carries on at the next interval.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let scanner = self.scanner.clone();
        let check_interval = self.check_interval;

        tokio::spawn(async move {
            tracing::info!(
                max_age_secs = scanner.max_age.as_secs(),
                interval_secs = check_interval.as_secs(),
                "Staleness detector started"
            );

            let mut ticker = interval(check_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = scanner.scan(Utc::now()).await {
                            tracing::error!(error = %e, "Staleness scan failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Staleness detector shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background loop
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

impl Scanner {
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    async fn scan(&self, now: DateTime<Utc>) -> Result<Vec<Node>, StoreError> {
        let cutoff = self.cutoff(now);
        let candidates = self.store.stale_node_ids(cutoff)?;

        let mut demoted = Vec::with_capacity(candidates.len());
        for id in candidates {
            match self.nodes.demote_if_stale(id, cutoff, now) {
                Ok(Some(node)) => demoted.push(node),
                // Reported in or already faulty since selection
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(node_id = id, error = %e, "Failed to demote stale node");
                }
            }
        }

        if demoted.is_empty() {
            return Ok(demoted);
        }

        tracing::warn!(count = demoted.len(), "Demoted stale nodes to faulty");

        // Demotions are already committed; dispatch cannot undo them
        for node in &demoted {
            self.dispatcher.notify(node.id, STALENESS_CONFIDENCE).await;
        }

        Ok(demoted)
    }
}
