use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::MonitorError;
use crate::health::StatsSnapshot;
use crate::model::{Device, Fault, NewFault, Node, NodeId, NodeStatus, Role};
use crate::service::Monitor;

/// Application state shared across handlers
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

/// Response envelope used by every API route
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: &'static str,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            message,
            data: Some(data),
        })
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn root() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        status: "ok",
        message: "Pole Fault Monitoring API is running",
        data: None,
    })
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterDeviceRequest {
    pub fcm_token: String,
    pub role: Role,
}

pub async fn register_device(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Device>>, ApiError> {
    let Json(request) = payload?;
    let device = state
        .monitor
        .register_device(&request.fcm_token, request.role)?;

    Ok(ApiResponse::success("Device registered", device))
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Deserialize)]
pub struct UpdateNodeRequest {
    pub node_id: NodeId,
    pub status: NodeStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Node>>>, ApiError> {
    let nodes = state.monitor.list_nodes()?;
    Ok(ApiResponse::success("Nodes fetched", nodes))
}

pub async fn update_node(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateNodeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Node>>, ApiError> {
    let Json(request) = payload?;
    let node = state
        .monitor
        .update_node(
            request.node_id,
            request.status,
            request.latitude,
            request.longitude,
        )
        .map_err(|e| {
            tracing::error!(node_id = request.node_id, error = %e, "Node update failed");
            ApiError::NotFound(format!(
                "Node {} not found or update failed",
                request.node_id
            ))
        })?;

    Ok(ApiResponse::success("Node updated", node))
}

// ============================================================================
// Faults
// ============================================================================

#[derive(Deserialize)]
pub struct ReportFaultRequest {
    pub node_id: NodeId,
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<ReportFaultRequest> for NewFault {
    fn from(request: ReportFaultRequest) -> Self {
        let fault = NewFault::new(request.node_id, request.description, request.confidence);
        match request.image_url {
            Some(url) => fault.with_image_url(url),
            None => fault,
        }
    }
}

pub async fn report_fault(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReportFaultRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Fault>>, ApiError> {
    let Json(request) = payload?;
    let fault = state.monitor.report_fault(request.into()).await?;
    Ok(ApiResponse::success("Fault reported", fault))
}

pub async fn list_faults(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Fault>>>, ApiError> {
    let faults = state.monitor.list_faults()?;
    Ok(ApiResponse::success("Faults fetched", faults))
}

// ============================================================================
// Stats
// ============================================================================

pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatsSnapshot>>, ApiError> {
    let stats = state.monitor.get_stats()?;
    Ok(ApiResponse::success("Stats computed", stats))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Validation(_) => ApiError::BadRequest(err.to_string()),
            MonitorError::NotFound(_) => ApiError::NotFound(err.to_string()),
            MonitorError::Store(e) => {
                tracing::error!(error = %e, "Store operation failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message
        });

        (status, Json(body)).into_response()
    }
}
