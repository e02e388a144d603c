//! polewatch server
//!
//! Run with: cargo run
//!
//! Configuration is read from the environment, see `polewatch::config` for
//! the full list. RUST_LOG controls log levels (default: polewatch=info).

use polewatch::api::run_server;
use polewatch::config::MonitorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polewatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env()?;

    tracing::info!("polewatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Heartbeat: max age {} seconds, checked every {} seconds",
        config.heartbeat_max_age.as_secs(),
        config.heartbeat_check_interval.as_secs()
    );
    tracing::info!(
        "  Alert channel timeout: {} seconds",
        config.channel_timeout.as_secs()
    );
    match &config.push {
        Some(push) => tracing::info!("  Push gateway: {}", push.url),
        None => tracing::info!("  Push gateway: DISABLED"),
    }
    match &config.email {
        Some(email) => tracing::info!(
            "  Mail relay: {} ({} recipients)",
            email.relay_url,
            email.recipients.len()
        ),
        None => tracing::info!("  Mail relay: DISABLED"),
    }
    match &config.snapshot {
        Some(snapshot) => tracing::info!(
            "  Snapshot: {} every {} seconds",
            snapshot.path.display(),
            snapshot.interval.as_secs()
        ),
        None => tracing::info!("  Snapshot: DISABLED (in-memory only)"),
    }
    if config.seed_sample_nodes {
        tracing::info!("  Sample nodes: seeded into an empty fleet");
    }

    run_server(config).await
}
