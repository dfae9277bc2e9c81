//! HTTP gateway: merges the per-area subrouters and shares the pipeline as
//! state, so `main.rs` never needs to know about individual endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::StoreError;
use crate::pipeline::Pipeline;

mod alerts;
mod events;
mod health;
mod readings;
mod refresh;
mod scores;
mod season;

// ---

pub fn router(pipeline: Pipeline) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(alerts::router())
        .merge(scores::router())
        .merge(refresh::router())
        .merge(events::router())
        .merge(season::router())
        .merge(health::router())
        .with_state(pipeline)
}

/// Default and maximum number of rows for list endpoints.
const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 200;

/// `?limit=N` for "most recent N" endpoints.
#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

impl LimitQuery {
    fn resolve(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Handler failure; details are logged, callers see a stable code.
#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, error, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "INVALID_VALUE", m),
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "storage is unavailable".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}
