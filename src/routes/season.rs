//! Current saffron season and the next change, by the server's local date.

use axum::{routing::get, Json, Router};
use chrono::Local;
use tracing::debug;

use crate::season::{report, SeasonReport};

// ---

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api/season", get(season))
}

/// `GET /api/season`
async fn season() -> Json<SeasonReport> {
    // ---
    let report = report(Local::now().date_naive());
    debug!("GET /api/season: {}", report.current_season.as_str());
    Json(report)
}
