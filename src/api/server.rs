use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_check, list_faults, list_nodes, register_device, report_fault, root, stats,
    update_node, AppState,
};
use crate::alerts::{AlertChannel, DisabledChannel, EmailChannel, PushChannel};
use crate::config::MonitorConfig;
use crate::service::Monitor;
use crate::storage::{MemoryStore, SnapshotManager, SnapshotWorker};

/// CORS policy for the given origins; an empty list allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        // Devices
        .route("/api/v1/devices/register", post(register_device))
        // Nodes
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/nodes/update", post(update_node))
        // Faults
        .route("/api/v1/faults", get(list_faults))
        .route("/api/v1/faults/report", post(report_fault))
        // Stats
        .route("/api/v1/stats", get(stats))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn load_store(config: &MonitorConfig) -> Result<MemoryStore, Box<dyn std::error::Error>> {
    let Some(snapshot) = &config.snapshot else {
        return Ok(MemoryStore::new());
    };

    let manager = SnapshotManager::new(&snapshot.path);
    match manager.load()? {
        Some(store) => {
            tracing::info!(
                path = %snapshot.path.display(),
                devices = store.device_count(),
                faults = store.fault_count(),
                "Restored store from snapshot"
            );
            Ok(store)
        }
        None => {
            tracing::info!(path = %snapshot.path.display(), "No snapshot found, starting empty");
            Ok(MemoryStore::new())
        }
    }
}

fn push_channel(config: &MonitorConfig) -> Arc<dyn AlertChannel> {
    let Some(push) = &config.push else {
        tracing::info!("Push gateway not configured, push alerts disabled");
        return Arc::new(DisabledChannel::new("push"));
    };

    match PushChannel::new(&push.url, push.api_key.clone(), config.channel_timeout) {
        Ok(channel) => Arc::new(channel),
        Err(e) => {
            tracing::error!(error = %e, "Push channel unavailable, push alerts disabled");
            Arc::new(DisabledChannel::new("push"))
        }
    }
}

fn email_channel(config: &MonitorConfig) -> Arc<dyn AlertChannel> {
    let Some(email) = &config.email else {
        tracing::info!("Mail relay not configured, email alerts disabled");
        return Arc::new(DisabledChannel::new("email"));
    };

    match EmailChannel::new(
        &email.relay_url,
        email.recipients.clone(),
        config.channel_timeout,
    ) {
        Ok(channel) => Arc::new(channel),
        Err(e) => {
            tracing::error!(error = %e, "Email channel unavailable, email alerts disabled");
            Arc::new(DisabledChannel::new("email"))
        }
    }
}

/// Run the HTTP server
pub async fn run_server(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(load_store(&config)?);

    let monitor = Arc::new(Monitor::new(
        store.clone(),
        push_channel(&config),
        email_channel(&config),
        config.channel_timeout,
    ));

    if config.seed_sample_nodes {
        let seeded = monitor.seed_sample_nodes()?;
        if seeded > 0 {
            tracing::info!("Seeded {} sample nodes", seeded);
        }
    }

    // Start background workers
    let mut detector =
        monitor.staleness_detector(config.heartbeat_max_age, config.heartbeat_check_interval);
    let detector_handle = detector.start();

    let snapshot_worker = config.snapshot.as_ref().map(|snapshot| {
        Arc::new(SnapshotWorker::new(
            Arc::clone(&store),
            SnapshotManager::new(&snapshot.path),
            snapshot.interval,
        ))
    });
    let snapshot_handle = snapshot_worker
        .as_ref()
        .map(|worker| Arc::clone(worker).start());

    let state = Arc::new(AppState { monitor });
    let app = build_router(state, cors_layer(&config.cors_allow_origins));

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!("Starting polewatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    detector.stop().await;
    if let Err(e) = detector_handle.await {
        tracing::warn!(error = %e, "Staleness detector task ended abnormally");
    }

    // The periodic task must be done before the final save reuses its temp file
    if let (Some(worker), Some(handle)) = (snapshot_worker, snapshot_handle) {
        worker.stop();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Snapshot worker task ended abnormally");
        }
        worker.save_now();
    }

    tracing::info!("polewatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping workers...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeStatus};
    use crate::storage::Store;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let monitor = Arc::new(Monitor::new(
            store.clone(),
            Arc::new(DisabledChannel::new("push")),
            Arc::new(DisabledChannel::new("email")),
            Duration::from_secs(1),
        ));
        (
            store,
            build_router(Arc::new(AppState { monitor }), cors_layer(&[])),
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_store, app) = create_test_app();

        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_liveness() {
        let (_store, app) = create_test_app();

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_report_fault_unknown_node() {
        let (store, app) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/api/v1/faults/report",
                serde_json::json!({"node_id": 42, "description": "sparking", "confidence": 90.0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(store.fault_count(), 0);
    }

    #[tokio::test]
    async fn test_report_fault_rejects_confidence() {
        let (store, app) = create_test_app();
        store
            .insert_node_if_absent(Node::new(1, NodeStatus::Normal, None, Utc::now()))
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/v1/faults/report",
                serde_json::json!({"node_id": 1, "description": "sparking", "confidence": 150.0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.fault_count(), 0);
    }

    #[tokio::test]
    async fn test_update_then_report_fault() {
        let (_store, app) = create_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/nodes/update",
                serde_json::json!({"node_id": 1, "status": "normal", "latitude": 12.5, "longitude": 77.25}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Node updated");
        assert_eq!(body["data"]["latitude"], 12.5);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/faults/report",
                serde_json::json!({"node_id": 1, "description": "leaning pole", "confidence": 87.5, "image_url": "http://img/1.jpg"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["image_url"], "http://img/1.jpg");

        let response = app.oneshot(get("/api/v1/stats")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_nodes"], 1);
        assert_eq!(body["data"]["active_faults_count"], 1);
        assert_eq!(body["data"]["fault_percentage"], 100.0);
    }

    #[tokio::test]
    async fn test_register_device() {
        let (store, app) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/api/v1/devices/register",
                serde_json::json!({"fcm_token": "T1", "role": "staff"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["fcm_token"], "T1");
        assert_eq!(body["data"]["role"], "staff");
        assert_eq!(store.device_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (_store, app) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/api/v1/nodes/update",
                serde_json::json!({"node_id": 1, "status": "broken"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_stats_empty_fleet() {
        let (_store, app) = create_test_app();

        let response = app.oneshot(get("/api/v1/stats")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_nodes"], 0);
        assert_eq!(body["data"]["fault_percentage"], 0.0);
    }

    #[tokio::test]
    async fn test_cors_allowlist() {
        let monitor = Arc::new(Monitor::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DisabledChannel::new("push")),
            Arc::new(DisabledChannel::new("email")),
            Duration::from_secs(1),
        ));
        let app = build_router(
            Arc::new(AppState { monitor }),
            cors_layer(&["http://localhost:8000".to_string()]),
        );

        let with_origin = |origin: &str| {
            Request::builder()
                .uri("/health")
                .header("origin", origin)
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(with_origin("http://localhost:8000"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:8000"
        );

        let response = app.oneshot(with_origin("http://evil.example")).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_cors_open_by_default() {
        let (_store, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://anywhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
