//! HTTP handlers for the JSON gateway

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sysinfo::System;
use tracing::debug;

use crate::rpc::{GetRequest, GetResponse, RpcError, SetRequest, SetResponse};
use crate::service::KvService;

/// Store and process statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Number of entries in the store
    pub keys: usize,
    /// Resident memory of the process in MB
    pub process_memory_mb: f64,
    /// CPU usage percentage (0-100)
    pub cpu_usage: f64,
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// RpcError rendered as an HTTP response
pub struct ApiError(RpcError);

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RpcError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Get a key
pub async fn get_handler(
    State(service): State<KvService>,
    Json(req): Json<GetRequest>,
) -> Result<Json<GetResponse>, ApiError> {
    debug!("HTTP get: {}", req.key);
    Ok(Json(service.get(req).await?))
}

/// Set a key
pub async fn set_handler(
    State(service): State<KvService>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>, ApiError> {
    debug!("HTTP set: {} ({} bytes)", req.key, req.value.len());
    Ok(Json(service.set(req).await?))
}

/// Get store and process statistics
pub async fn stats_handler(State(service): State<KvService>) -> impl IntoResponse {
    let keys = service.store().len().await;

    let mut sys = System::new_all();
    sys.refresh_all();

    let process_memory_bytes = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|process| process.memory())
        .unwrap_or(0);

    let stats = StatsResponse {
        keys,
        process_memory_mb: process_memory_bytes as f64 / 1024.0 / 1024.0,
        cpu_usage: sys.global_cpu_usage() as f64,
    };

    (StatusCode::OK, Json(stats))
}
