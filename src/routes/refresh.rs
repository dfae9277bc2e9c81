//! Manual refresh: run one pipeline cycle synchronously.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use crate::models::{HealthScore, SensorReading};
use crate::pipeline::Pipeline;

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new().route("/api/refresh", post(handler))
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reading: Option<SensorReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alerts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<HealthScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// `POST /api/refresh`
///
/// Failures surface as a generic "could not refresh"; the cause is only
/// logged.
async fn handler(State(pipeline): State<Pipeline>) -> impl IntoResponse {
    // ---
    info!("POST /api/refresh - Starting cycle");

    match pipeline.run_cycle().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                reading: Some(outcome.reading),
                alerts: Some(outcome.alerts),
                score: Some(outcome.score),
                error: None,
            }),
        ),
        Err(e) => {
            error!("Refresh failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(RefreshResponse {
                    success: false,
                    reading: None,
                    alerts: None,
                    score: None,
                    error: Some("could not refresh"),
                }),
            )
        }
    }
}
