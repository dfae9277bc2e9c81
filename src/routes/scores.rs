//! Health score endpoints: latest value and trend history.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::{ApiError, LimitQuery};
use crate::models::HealthScore;
use crate::pipeline::Pipeline;

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/api/health-score/latest", get(latest_score))
        .route("/api/health-scores", get(score_history))
}

async fn latest_score(State(pipeline): State<Pipeline>) -> Result<Json<HealthScore>, ApiError> {
    // ---
    pipeline
        .repository()
        .store()
        .latest_health_score()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no health score yet".into()))
}

async fn score_history(
    Query(params): Query<LimitQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<Vec<HealthScore>>, ApiError> {
    // ---
    let history = pipeline
        .repository()
        .store()
        .health_score_history(params.resolve())
        .await?;
    Ok(Json(history))
}
