//! REST API module using Axum
//!
//! Exposes frame ingestion and read-back under `/api/v1`:
//! - `POST /patients/:patient_id/frames` - ingest one frame
//! - `POST /patients/:patient_id/uploads` - ingest a multi-frame upload
//! - `GET  /patients/:patient_id/frames` - recent frames, newest first
//! - `GET  /patients/:patient_id/alerts` - alerts, newest first
//! - `GET  /frames/:frame_id` - one frame with its raw payload
//! - `GET  /health`

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `PLANTAR_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for development.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match std::env::var("PLANTAR_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    let max_body = state.ingestor.config().server.max_upload_bytes;

    Router::new()
        .nest("/api/v1", routes::api_routes(state))
        // Replace axum's 2 MB extractor default with the configured upload cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
