//! Server-Sent Events: one event per insertion into a collection.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use tracing::{debug, warn};

use super::ApiError;
use crate::pipeline::Pipeline;
use crate::store::{EntityKind, Subscription};

// ---

pub fn router() -> Router<Pipeline> {
    // ---
    Router::new().route("/api/events/{kind}", get(handler))
}

/// `GET /api/events/{kind}` where kind is `readings`, `alerts` or
/// `health-scores`. The subscription ends when the client disconnects.
async fn handler(
    Path(kind): Path<String>,
    State(pipeline): State<Pipeline>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // ---
    let kind: EntityKind = kind.parse().map_err(ApiError::BadRequest)?;
    debug!("New {} subscriber", kind.collection());

    let subscription = pipeline.repository().subscribe(kind);
    Ok(Sse::new(events(subscription)).keep_alive(KeepAlive::default()))
}

fn events(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    // ---
    stream::unfold(subscription, |mut sub| async move {
        let change = sub.recv().await?;
        let event = Event::default()
            .event(sub.kind().collection())
            .json_data(&change)
            .unwrap_or_else(|e| {
                warn!("Dropping unserializable notification: {}", e);
                Event::default().comment("unserializable notification")
            });
        Some((Ok(event), sub))
    })
}
