//! Best-effort alert fan-out to staff devices

use std::sync::Arc;
use std::time::Duration;

use super::channel::{AlertChannel, AlertMessage, Delivery};
use crate::config::DEFAULT_CHANNEL_TIMEOUT_SECS;
use crate::model::NodeId;
use crate::registry::DeviceRegistry;

/// Default bound on a single channel call
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CHANNEL_TIMEOUT_SECS);

/// What happened on one channel during a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    Delivered(Delivery),
    Failed(String),
    TimedOut,
    /// Not attempted: no targets, or the channel is not configured
    Skipped,
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered(_))
    }
}

/// Result of one [`AlertDispatcher::notify`] call
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub targets: usize,
    pub push: ChannelOutcome,
    pub email: ChannelOutcome,
}

impl DispatchReport {
    fn skipped() -> Self {
        Self {
            targets: 0,
            push: ChannelOutcome::Skipped,
            email: ChannelOutcome::Skipped,
        }
    }
}

/// Fans an alert out to the push and email channels.
///
/// Staff targets are looked up on every call. The two channels run
/// concurrently and independently; their errors and timeouts are logged and
/// never returned to the caller.
pub struct AlertDispatcher {
    devices: Arc<DeviceRegistry>,
    push: Arc<dyn AlertChannel>,
    email: Arc<dyn AlertChannel>,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        push: Arc<dyn AlertChannel>,
        email: Arc<dyn AlertChannel>,
    ) -> Self {
        Self {
            devices,
            push,
            email,
            timeout: DEFAULT_CHANNEL_TIMEOUT,
        }
    }

    /// Set the per-channel timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Alert all staff devices that `node_id` went faulty
    pub async fn notify(&self, node_id: NodeId, confidence: f64) -> DispatchReport {
        let targets = match self.devices.staff_tokens() {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(node_id, error = %e, "Failed to resolve staff targets");
                return DispatchReport::skipped();
            }
        };

        if targets.is_empty() {
            tracing::info!(node_id, "No staff targets; skipping notification");
            return DispatchReport::skipped();
        }

        let message = AlertMessage::fault(node_id, confidence);
        let (push, email) = tokio::join!(
            self.deliver(self.push.as_ref(), &targets, &message, node_id),
            self.deliver(self.email.as_ref(), &targets, &message, node_id),
        );

        DispatchReport {
            targets: targets.len(),
            push,
            email,
        }
    }

    async fn deliver(
        &self,
        channel: &dyn AlertChannel,
        targets: &[String],
        message: &AlertMessage,
        node_id: NodeId,
    ) -> ChannelOutcome {
        if !channel.is_enabled() {
            tracing::warn!(
                channel = channel.name(),
                node_id,
                "Channel not configured; skipping"
            );
            return ChannelOutcome::Skipped;
        }

        match tokio::time::timeout(self.timeout, channel.send(targets, message)).await {
            Ok(Ok(delivery)) => {
                tracing::info!(
                    channel = channel.name(),
                    node_id,
                    delivered = delivery.delivered,
                    failed = delivery.failed,
                    "Alert sent"
                );
                ChannelOutcome::Delivered(delivery)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    channel = channel.name(),
                    node_id,
                    error = %e,
                    "Failed to send alert"
                );
                ChannelOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    channel = channel.name(),
                    node_id,
                    timeout = ?self.timeout,
                    "Alert channel timed out"
                );
                ChannelOutcome::TimedOut
            }
        }
    }
}
