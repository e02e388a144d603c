//! Email alerts through an HTTP mail relay

use futures::future::BoxFuture;
use std::time::Duration;

use super::channel::{AlertChannel, AlertMessage, ChannelError, Delivery};

/// Posts one message per alert to a mail relay for a fixed recipient list.
///
/// Device tokens are not addresses, so the staff targets only decide whether
/// a mail goes out at all; the recipients come from configuration.
pub struct EmailChannel {
    client: reqwest::Client,
    endpoint: String,
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(
        endpoint: impl Into<String>,
        recipients: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ChannelError::Config("mail relay URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            recipients,
        })
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    async fn send_mail(&self, message: &AlertMessage) -> Result<Delivery, ChannelError> {
        let payload = serde_json::json!({
            "to": self.recipients,
            "subject": message.title,
            "text": message.body,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("Failed to reach mail relay: {}", e)))?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected(response.status().as_u16()));
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            recipients = self.recipients.len(),
            "Alert email sent"
        );

        Ok(Delivery {
            delivered: self.recipients.len(),
            failed: 0,
        })
    }
}

impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        !self.recipients.is_empty()
    }

    fn send<'a>(
        &'a self,
        _targets: &'a [String],
        message: &'a AlertMessage,
    ) -> BoxFuture<'a, Result<Delivery, ChannelError>> {
        Box::pin(self.send_mail(message))
    }
}
