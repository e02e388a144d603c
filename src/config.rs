//! Runtime configuration read from environment variables
//!
//! - POLEWATCH_HOST: Bind address (default: 0.0.0.0)
//! - POLEWATCH_PORT: Port number (default: 8000)
//! - HEARTBEAT_MAX_AGE_SECONDS: Silence after which a node is faulty (default: 300)
//! - HEARTBEAT_CHECK_INTERVAL_SECONDS: Staleness scan period (default: 60)
//! - ALERT_CHANNEL_TIMEOUT_SECONDS: Bound on one push/email call (default: 5)
//! - PUSH_GATEWAY_URL / PUSH_GATEWAY_KEY: Push gateway; push is off when unset
//! - EMAIL_RELAY_URL / ALERT_EMAIL_TO: Mail relay and comma-separated recipients
//! - SNAPSHOT_PATH / SNAPSHOT_INTERVAL_SECONDS: Store snapshot file and save period (default: 300)
//! - SEED_SAMPLE_NODES: Insert sample nodes into an empty fleet (1/true/yes)
//! - CORS_ALLOW_ORIGINS: Comma-separated allowed origins; any origin when unset or `*`

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HEARTBEAT_MAX_AGE_SECS: u64 = 300;
pub const DEFAULT_HEARTBEAT_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 300;

/// Push gateway settings
#[derive(Debug, Clone, PartialEq)]
pub struct PushConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Mail relay settings
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub relay_url: String,
    pub recipients: Vec<String>,
}

/// Snapshot persistence settings
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_max_age: Duration,
    pub heartbeat_check_interval: Duration,
    pub channel_timeout: Duration,
    pub push: Option<PushConfig>,
    pub email: Option<EmailConfig>,
    pub snapshot: Option<SnapshotConfig>,
    pub seed_sample_nodes: bool,
    /// Allowed CORS origins; empty allows any origin
    pub cors_allow_origins: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            heartbeat_max_age: Duration::from_secs(DEFAULT_HEARTBEAT_MAX_AGE_SECS),
            heartbeat_check_interval: Duration::from_secs(DEFAULT_HEARTBEAT_CHECK_INTERVAL_SECS),
            channel_timeout: Duration::from_secs(DEFAULT_CHANNEL_TIMEOUT_SECS),
            push: None,
            email: None,
            snapshot: None,
            seed_sample_nodes: false,
            cors_allow_origins: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset and blank values take defaults
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(host) = get("POLEWATCH_HOST") {
            config.host = host;
        }
        if let Some(port) = get("POLEWATCH_PORT") {
            config.port = parse("POLEWATCH_PORT", &port)?;
        }

        config.heartbeat_max_age = Duration::from_secs(
            get("HEARTBEAT_MAX_AGE_SECONDS")
                .map(|v| parse::<u64>("HEARTBEAT_MAX_AGE_SECONDS", &v))
                .transpose()?
                .unwrap_or(DEFAULT_HEARTBEAT_MAX_AGE_SECS),
        );
        config.heartbeat_check_interval = positive_secs(
            "HEARTBEAT_CHECK_INTERVAL_SECONDS",
            get("HEARTBEAT_CHECK_INTERVAL_SECONDS"),
            DEFAULT_HEARTBEAT_CHECK_INTERVAL_SECS,
        )?;
        config.channel_timeout = positive_secs(
            "ALERT_CHANNEL_TIMEOUT_SECONDS",
            get("ALERT_CHANNEL_TIMEOUT_SECONDS"),
            DEFAULT_CHANNEL_TIMEOUT_SECS,
        )?;

        config.push = get("PUSH_GATEWAY_URL").map(|url| PushConfig {
            url,
            api_key: get("PUSH_GATEWAY_KEY"),
        });

        config.email = match (get("EMAIL_RELAY_URL"), get("ALERT_EMAIL_TO")) {
            (Some(relay_url), Some(to)) => {
                let recipients = split_list(&to);
                (!recipients.is_empty()).then_some(EmailConfig {
                    relay_url,
                    recipients,
                })
            }
            _ => None,
        };

        if let Some(path) = get("SNAPSHOT_PATH") {
            config.snapshot = Some(SnapshotConfig {
                path: PathBuf::from(path),
                interval: positive_secs(
                    "SNAPSHOT_INTERVAL_SECONDS",
                    get("SNAPSHOT_INTERVAL_SECONDS"),
                    DEFAULT_SNAPSHOT_INTERVAL_SECS,
                )?,
            });
        }

        if let Some(origins) = get("CORS_ALLOW_ORIGINS") {
            let origins = split_list(&origins);
            if !origins.iter().any(|o| o == "*") {
                config.cors_allow_origins = origins;
            }
        }

        config.seed_sample_nodes = get("SEED_SAMPLE_NODES")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn positive_secs(
    key: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let secs = match value {
        Some(v) => parse::<u64>(key, &v)?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.heartbeat_max_age, Duration::from_secs(300));
        assert_eq!(config.heartbeat_check_interval, Duration::from_secs(60));
        assert_eq!(config.channel_timeout, Duration::from_secs(5));
        assert!(config.push.is_none());
        assert!(config.email.is_none());
        assert!(config.snapshot.is_none());
        assert!(!config.seed_sample_nodes);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("POLEWATCH_PORT", "9100"),
            ("HEARTBEAT_MAX_AGE_SECONDS", "120"),
            ("HEARTBEAT_CHECK_INTERVAL_SECONDS", "15"),
            ("PUSH_GATEWAY_URL", "https://push.example.com/send"),
            ("PUSH_GATEWAY_KEY", "k"),
            ("EMAIL_RELAY_URL", "https://mail.example.com/send"),
            ("ALERT_EMAIL_TO", "ops@example.com, ,lead@example.com"),
            ("SNAPSHOT_PATH", "/var/lib/polewatch/store.json"),
            ("SEED_SAMPLE_NODES", "Yes"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9100");
        assert_eq!(config.heartbeat_max_age, Duration::from_secs(120));
        assert_eq!(config.heartbeat_check_interval, Duration::from_secs(15));
        assert_eq!(
            config.push,
            Some(PushConfig {
                url: "https://push.example.com/send".to_string(),
                api_key: Some("k".to_string()),
            })
        );
        assert_eq!(
            config.email.unwrap().recipients,
            vec!["ops@example.com".to_string(), "lead@example.com".to_string()]
        );
        let snapshot = config.snapshot.unwrap();
        assert_eq!(snapshot.interval, Duration::from_secs(300));
        assert!(config.seed_sample_nodes);
    }

    #[test]
    fn test_email_needs_recipients() {
        let config = from_pairs(&[
            ("EMAIL_RELAY_URL", "https://mail.example.com/send"),
            ("ALERT_EMAIL_TO", " , "),
        ])
        .unwrap();
        assert!(config.email.is_none());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = from_pairs(&[("HEARTBEAT_MAX_AGE_SECONDS", "five")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "HEARTBEAT_MAX_AGE_SECONDS",
                ..
            }
        ));

        assert!(from_pairs(&[("HEARTBEAT_CHECK_INTERVAL_SECONDS", "0")]).is_err());
        assert!(from_pairs(&[("POLEWATCH_PORT", "70000")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = from_pairs(&[("HEARTBEAT_MAX_AGE_SECONDS", "  ")]).unwrap();
        assert_eq!(config.heartbeat_max_age, Duration::from_secs(300));
    }

    #[test]
    fn test_channel_timeout_default_matches_dispatcher() {
        assert_eq!(
            MonitorConfig::default().channel_timeout,
            crate::alerts::DEFAULT_CHANNEL_TIMEOUT
        );
    }

    #[test]
    fn test_cors_origins() {
        let config = from_pairs(&[]).unwrap();
        assert!(config.cors_allow_origins.is_empty());

        let config = from_pairs(&[(
            "CORS_ALLOW_ORIGINS",
            "http://localhost:8000, ,http://10.0.2.2:8000",
        )])
        .unwrap();
        assert_eq!(
            config.cors_allow_origins,
            vec![
                "http://localhost:8000".to_string(),
                "http://10.0.2.2:8000".to_string()
            ]
        );

        let config = from_pairs(&[("CORS_ALLOW_ORIGINS", "http://localhost:8000,*")]).unwrap();
        assert!(config.cors_allow_origins.is_empty());
    }
}
