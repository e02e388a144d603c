//! Outbound notification channels

use futures::future::BoxFuture;

use crate::model::NodeId;

/// Title used for every fault alert
pub const FAULT_ALERT_TITLE: &str = "⚡ Fault Detected";

/// Rendered alert content handed to a channel
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
}

impl AlertMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Alert announcing that a node went faulty
    pub fn fault(node_id: NodeId, confidence: f64) -> Self {
        Self::new(
            FAULT_ALERT_TITLE,
            format!(
                "Node {} reported faulty with confidence {}%",
                node_id, confidence
            ),
        )
    }
}

/// Per-call delivery counts reported by a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// A notification transport.
///
/// Senders are fire-and-forget with their own retry policy; the dispatcher
/// treats any error as non-fatal.
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the underlying transport is configured
    fn is_enabled(&self) -> bool {
        true
    }

    fn send<'a>(
        &'a self,
        targets: &'a [String],
        message: &'a AlertMessage,
    ) -> BoxFuture<'a, Result<Delivery, ChannelError>>;
}

/// Stand-in for a transport that has no credentials or endpoint configured
#[derive(Debug, Clone)]
pub struct DisabledChannel {
    name: String,
}

impl DisabledChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl AlertChannel for DisabledChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn send<'a>(
        &'a self,
        targets: &'a [String],
        _message: &'a AlertMessage,
    ) -> BoxFuture<'a, Result<Delivery, ChannelError>> {
        Box::pin(async move {
            tracing::debug!(
                channel = %self.name,
                targets = targets.len(),
                "Channel disabled; dropping alert"
            );
            Ok(Delivery::default())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Endpoint returned status {0}")]
    Rejected(u16),

    #[error("Invalid channel configuration: {0}")]
    Config(String),
}
