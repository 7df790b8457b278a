//! API handlers
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or [`ApiErrorResponse`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::defaults::{DEFAULT_FRAME_LIST_LIMIT, MAX_FRAME_LIST_LIMIT};
use crate::ingestion::FrameIngestor;
use crate::storage::FrameStore;
use crate::types::{Frame, PatientId, RiskLevel};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub ingestor: Arc<FrameIngestor>,
    /// Read side; the same store the ingestor writes to
    pub store: Arc<dyn FrameStore>,
    /// Cancelled on shutdown; stops in-flight batch uploads between frames
    pub shutdown: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(ingestor: Arc<FrameIngestor>, shutdown: CancellationToken) -> Self {
        Self {
            store: Arc::clone(ingestor.store()),
            ingestor,
            shutdown,
            started_at: Utc::now(),
        }
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProcessFrameRequest {
    pub csv_data: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameListQuery {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Frame without its raw payload, for list and ingest responses.
#[derive(Debug, Serialize)]
pub struct FrameSummary {
    pub id: Uuid,
    pub patient_id: PatientId,
    pub timestamp: DateTime<Utc>,
    pub peak_pressure_index: f64,
    pub contact_area_percent: f64,
    pub risk_level: RiskLevel,
    pub is_flagged_for_review: bool,
}

impl From<Frame> for FrameSummary {
    fn from(f: Frame) -> Self {
        Self {
            id: f.id,
            patient_id: f.patient_id,
            timestamp: f.timestamp,
            peak_pressure_index: f.peak_pressure_index,
            contact_area_percent: f.contact_area_percent,
            risk_level: f.risk_level,
            is_flagged_for_review: f.is_flagged_for_review,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_backend: &'static str,
    pub grid_size: usize,
    pub uptime_secs: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/health
pub async fn health(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_backend: state.store.backend_name(),
        grid_size: state.ingestor.config().grid.size,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// POST /api/v1/patients/:patient_id/frames
pub async fn process_frame(
    State(state): State<ApiState>,
    Path(patient_id): Path<String>,
    request: Result<Json<ProcessFrameRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return ApiErrorResponse::rejected(e.status(), e.body_text()),
    };
    let patient_id = PatientId::new(patient_id);
    match state
        .ingestor
        .process_frame(&patient_id, &request.csv_data, request.timestamp)
        .await
    {
        Ok(frame) => ApiResponse::created(FrameSummary::from(frame)),
        Err(e) => ApiErrorResponse::ingest(&e),
    }
}

/// POST /api/v1/patients/:patient_id/uploads
pub async fn upload_batch(
    State(state): State<ApiState>,
    Path(patient_id): Path<String>,
    request: Result<Json<BatchUploadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return ApiErrorResponse::rejected(e.status(), e.body_text()),
    };
    let patient_id = PatientId::new(patient_id);
    match state
        .ingestor
        .process_batch(&patient_id, &request.file_name, &request.content, &state.shutdown)
        .await
    {
        Ok(result) => ApiResponse::ok(result),
        Err(e) => ApiErrorResponse::ingest(&e),
    }
}

/// GET /api/v1/patients/:patient_id/frames?since=...&limit=100
pub async fn list_frames(
    State(state): State<ApiState>,
    Path(patient_id): Path<String>,
    query: Result<Query<FrameListQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(e) => return ApiErrorResponse::rejected(e.status(), e.body_text()),
    };
    let limit = q
        .limit
        .unwrap_or(DEFAULT_FRAME_LIST_LIMIT)
        .min(MAX_FRAME_LIST_LIMIT);

    match state
        .store
        .list_frames(&PatientId::new(patient_id), q.since, limit)
        .await
    {
        Ok(frames) => {
            let items: Vec<FrameSummary> = frames.into_iter().map(Into::into).collect();
            ApiResponse::ok(items)
        }
        Err(e) => ApiErrorResponse::internal(format!("Storage error: {e}")),
    }
}

/// GET /api/v1/patients/:patient_id/alerts
pub async fn list_alerts(
    State(state): State<ApiState>,
    Path(patient_id): Path<String>,
) -> Response {
    match state.store.list_alerts(&PatientId::new(patient_id)).await {
        Ok(alerts) => ApiResponse::ok(alerts),
        Err(e) => ApiErrorResponse::internal(format!("Storage error: {e}")),
    }
}

/// GET /api/v1/frames/:frame_id (includes the raw payload)
pub async fn get_frame(
    State(state): State<ApiState>,
    frame_id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(frame_id) = match frame_id {
        Ok(p) => p,
        Err(e) => return ApiErrorResponse::rejected(e.status(), e.body_text()),
    };
    match state.store.get_frame(frame_id).await {
        Ok(Some(frame)) => ApiResponse::ok(frame),
        Ok(None) => ApiErrorResponse::not_found(format!("No frame with id {frame_id}")),
        Err(e) => ApiErrorResponse::internal(format!("Storage error: {e}")),
    }
}
