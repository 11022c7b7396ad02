use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::evaluator::RunnerStats;
use crate::params::{AssetParameters, InMemoryParameterStore, ParameterStore};
use crate::telemetry::{decode_payload, Measurement};

/// Application state shared across handlers
pub struct AppState {
    pub params: Arc<InMemoryParameterStore>,
    pub ingest_tx: mpsc::Sender<Measurement>,
    pub stats: Arc<RwLock<RunnerStats>>,
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

// ============================================================================
// Ingest
// ============================================================================

#[derive(Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let measurements = decode_payload(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let total = measurements.len();
    let mut accepted = 0;
    for measurement in measurements {
        if state.ingest_tx.send(measurement).await.is_err() {
            tracing::error!(accepted, total, "Evaluator stopped during ingest");
            return Err(ApiError::Interrupted { accepted, total });
        }
        accepted += 1;
    }

    Ok(Json(IngestResponse { accepted }))
}

// ============================================================================
// Parameters
// ============================================================================

pub async fn list_parameters(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, AssetParameters>> {
    Json(state.params.snapshot())
}

pub async fn get_parameters(
    State(state): State<Arc<AppState>>,
    Path(asset): Path<String>,
) -> Result<Json<AssetParameters>, ApiError> {
    state
        .params
        .get(&asset)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Asset '{}' has no parameters", asset)))
}

#[derive(Serialize)]
pub struct PutParametersResponse {
    pub asset: String,
    pub replaced: bool,
}

pub async fn put_parameters(
    State(state): State<Arc<AppState>>,
    Path(asset): Path<String>,
    Json(params): Json<AssetParameters>,
) -> Json<PutParametersResponse> {
    let replaced = state.params.upsert(asset.clone(), params).is_some();
    tracing::info!(asset = %asset, replaced, "Asset parameters updated");

    Json(PutParametersResponse { asset, replaced })
}

// ============================================================================
// Stats
// ============================================================================

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<RunnerStats> {
    Json(state.stats.read().clone())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// Evaluator went away after `accepted` of `total` measurements were
    /// forwarded
    Interrupted { accepted: usize, total: usize },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Interrupted { accepted, total } => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": "Evaluator is not running",
                    "accepted": accepted,
                    "total": total
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
