//! API route table.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Build the `/api/v1` router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Ingestion
        .route(
            "/patients/:patient_id/frames",
            post(handlers::process_frame).get(handlers::list_frames),
        )
        .route("/patients/:patient_id/uploads", post(handlers::upload_batch))
        // Read-back
        .route("/patients/:patient_id/alerts", get(handlers::list_alerts))
        .route("/frames/:frame_id", get(handlers::get_frame))
        .with_state(state)
}
