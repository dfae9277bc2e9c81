//! Alert listing and the operator's resolve action.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ApiError, LimitQuery};
use crate::models::Alert;
use crate::pipeline::Pipeline;

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new()
        .route("/api/alerts", get(latest_alerts))
        .route("/api/alerts/{id}/resolve", post(resolve_alert))
}

/// `GET /api/alerts?limit=N`, newest first.
async fn latest_alerts(
    Query(params): Query<LimitQuery>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    // ---
    let limit = params.resolve();
    debug!("GET /api/alerts limit={}", limit);
    let alerts = pipeline.repository().store().latest_alerts(limit).await?;
    Ok(Json(alerts))
}

/// `POST /api/alerts/{id}/resolve`
///
/// The only way an alert becomes resolved; the pipeline never calls this.
async fn resolve_alert(
    Path(id): Path<String>,
    State(pipeline): State<Pipeline>,
) -> Result<Json<Alert>, ApiError> {
    // ---
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest(format!("invalid alert id '{id}'")))?;

    let alert = pipeline
        .repository()
        .store()
        .resolve_alert(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("alert {id} not found")))?;

    info!("Alert {} resolved by operator", id);
    Ok(Json(alert))
}
