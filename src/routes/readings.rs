//! Latest reading and the active threshold table.

use axum::{extract::State, routing::get, Json, Router};
use tracing::debug;

use super::ApiError;
use crate::models::SensorReading;
use crate::pipeline::Pipeline;
use crate::ranges::Thresholds;

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/api/readings/latest", get(latest_reading))
        .route("/api/ranges", get(ranges))
}

/// `GET /api/readings/latest`
async fn latest_reading(State(pipeline): State<Pipeline>) -> Result<Json<SensorReading>, ApiError> {
    // ---
    debug!("GET /api/readings/latest");
    pipeline
        .repository()
        .store()
        .latest_reading()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no readings yet".into()))
}

/// `GET /api/ranges`
async fn ranges(State(pipeline): State<Pipeline>) -> Json<Thresholds> {
    Json(pipeline.thresholds().clone())
}
