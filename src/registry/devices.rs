use chrono::Utc;
use std::sync::Arc;

use crate::error::MonitorError;
use crate::model::{Device, Role};
use crate::storage::{Store, StoreError};

/// Registration of notification devices
pub struct DeviceRegistry {
    store: Arc<dyn Store>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a device, or update the role of an already known token
    pub fn register(&self, token: &str, role: Role) -> Result<Device, MonitorError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(MonitorError::validation("notification token must not be empty"));
        }

        let device = self.store.upsert_device(token, role, Utc::now())?;
        tracing::debug!(device_id = device.id, role = %device.role, "Device registered");
        Ok(device)
    }

    /// Tokens of every staff device, read fresh from the store
    pub fn staff_tokens(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .devices_with_role(Role::Staff)?
            .into_iter()
            .map(|d| d.notification_token)
            .collect())
    }
}
