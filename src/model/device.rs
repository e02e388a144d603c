use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a registered device plays when alerts go out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

/// A device registered for notifications.
///
/// The notification token is the identity: registering the same token again
/// updates the role of the existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    #[serde(rename = "fcm_token")]
    pub notification_token: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
