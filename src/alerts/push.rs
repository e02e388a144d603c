//! Push notifications through an HTTP multicast gateway

use futures::future::BoxFuture;
use serde::Deserialize;
use std::time::Duration;

use super::channel::{AlertChannel, AlertMessage, ChannelError, Delivery};

/// Sends one multicast request per alert to a push gateway.
///
/// The payload carries the device tokens plus a `notification` object with
/// title and body. Gateways that answer with `success_count` and
/// `failure_count` have those counts reported back; otherwise every token is
/// counted as delivered.
pub struct PushChannel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MulticastResponse {
    success_count: usize,
    failure_count: usize,
}

impl PushChannel {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ChannelError::Config("push gateway URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn send_multicast(
        &self,
        targets: &[String],
        message: &AlertMessage,
    ) -> Result<Delivery, ChannelError> {
        let payload = serde_json::json!({
            "tokens": targets,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("Failed to reach push gateway: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected(response.status().as_u16()));
        }

        let delivery = match response.json::<MulticastResponse>().await {
            Ok(counts) => Delivery {
                delivered: counts.success_count,
                failed: counts.failure_count,
            },
            Err(_) => Delivery {
                delivered: targets.len(),
                failed: 0,
            },
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Push multicast sent"
        );
        Ok(delivery)
    }
}

impl AlertChannel for PushChannel {
    fn name(&self) -> &str {
        "push"
    }

    fn send<'a>(
        &'a self,
        targets: &'a [String],
        message: &'a AlertMessage,
    ) -> BoxFuture<'a, Result<Delivery, ChannelError>> {
        Box::pin(self.send_multicast(targets, message))
    }
}
