//! One ingestion cycle: fetch → normalize → evaluate + score → persist.
//!
//! A cycle is a self-contained transaction against the store. Cycles do not
//! coordinate with each other; two overlapping cycles simply append two
//! valid rows each. A reading older than the newest stored one is refused by
//! the store itself, so the check holds for overlapping cycles too.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, Instrument};

use crate::error::PipelineError;
use crate::evaluate::evaluate;
use crate::feed::FeedClient;
use crate::models::{HealthScore, SensorReading};
use crate::normalize::normalize;
use crate::ranges::Thresholds;
use crate::scoring::score;
use crate::store::Repository;

// ---

/// Result of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub reading: SensorReading,
    /// Number of alerts raised by this cycle.
    pub alerts: usize,
    pub score: HealthScore,
}

#[derive(Clone)]
pub struct Pipeline {
    feed: FeedClient,
    thresholds: Arc<Thresholds>,
    repo: Repository,
}

impl Pipeline {
    pub fn new(feed: FeedClient, thresholds: Arc<Thresholds>, repo: Repository) -> Self {
        Self {
            feed,
            thresholds,
            repo,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Run one full cycle. Any error aborts the cycle; nothing is retried.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, PipelineError> {
        // ---
        let span = tracing::info_span!("ingestion_cycle");
        async {
            let payload = self.feed.fetch_latest_feed().await?;
            let reading = normalize(&payload)?;

            let alerts = evaluate(&reading, &self.thresholds);
            let score = score(&reading, &self.thresholds);

            self.repo.persist(&reading, &alerts, &score).await?;

            info!(
                "Cycle complete: entry {:?}, {} alert(s), score {}",
                reading.entry_id,
                alerts.len(),
                score.score
            );

            Ok(CycleOutcome {
                reading,
                alerts: alerts.len(),
                score,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{FactorStatus, Severity, Substance};
    use crate::store::{EntityKind, MemoryStore, Publisher, Store};
    use axum::{extract::State, http::StatusCode, routing::get, Router};
    use std::sync::Mutex;
    use std::time::Duration;

    type Reply = Arc<Mutex<(StatusCode, String)>>;

    /// Serve whatever `reply` holds at `/channels/1/feeds.json`.
    async fn spawn_gateway(reply: Reply) -> String {
        // ---
        async fn feed(State(reply): State<Reply>) -> (StatusCode, String) {
            reply.lock().unwrap().clone()
        }

        let app = Router::new()
            .route("/channels/1/feeds.json", get(feed))
            .with_state(reply);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/channels/1/feeds.json")
    }

    fn feed_body(created_at: &str, n: &str, p: &str, k: &str, moisture: &str) -> String {
        format!(
            r#"{{"channel": {{"id": 1}}, "feeds": [{{"created_at": "{created_at}", "entry_id": 9,
                "field1": "{n}", "field2": "{p}", "field3": "{k}", "field4": "{moisture}"}}]}}"#
        )
    }

    async fn setup(status: StatusCode, body: String) -> (Pipeline, Arc<MemoryStore>, Reply) {
        // ---
        let reply: Reply = Arc::new(Mutex::new((status, body)));
        let url = spawn_gateway(reply.clone()).await;
        let feed = FeedClient::new(url, Some("key".into()), 1, Duration::from_secs(5)).unwrap();
        let store = Arc::new(MemoryStore::default());
        let repo = Repository::new(store.clone(), Publisher::default());
        let pipeline = Pipeline::new(feed, Arc::new(Thresholds::default()), repo);
        (pipeline, store, reply)
    }

    #[tokio::test]
    async fn test_cycle_mixed_npk_conditions() {
        // ---
        let body = feed_body("2025-10-01T06:15:00Z", "255", "45", "5", "700");
        let (pipeline, store, _) = setup(StatusCode::OK, body).await;
        let mut alert_sub = pipeline.repository().subscribe(EntityKind::Alert);

        let outcome = pipeline.run_cycle().await.unwrap();

        assert_eq!(outcome.alerts, 2);
        assert_eq!(outcome.score.score, 60);
        assert_eq!(outcome.score.factors[&Substance::Potassium], FactorStatus::Low);
        assert_eq!(outcome.reading.nitrogen, 255.0);

        assert_eq!(store.latest_alerts(10).await.unwrap().len(), 2);
        assert_eq!(store.latest_health_score().await.unwrap().unwrap().score, 60);
        assert!(alert_sub.try_recv().is_some());
        assert!(alert_sub.try_recv().is_some());
        assert!(alert_sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_cycle_low_moisture() {
        // ---
        let body = feed_body("2025-10-01T06:15:00Z", "100", "80", "90", "450");
        let (pipeline, store, _) = setup(StatusCode::OK, body).await;

        let outcome = pipeline.run_cycle().await.unwrap();
        assert_eq!(outcome.alerts, 1);
        assert_eq!(outcome.score.score, 70);

        let alerts = store.latest_alerts(10).await.unwrap();
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_unparseable_payload_writes_nothing() {
        // ---
        let body = r#"{"channel": {}, "feeds": [{"created_at": "2025-10-01T06:15:00Z"}]}"#;
        let (pipeline, store, _) = setup(StatusCode::OK, body.to_string()).await;

        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::Normalization(_)));
        assert!(store.latest_reading().await.unwrap().is_none());
        assert!(store.latest_alerts(10).await.unwrap().is_empty());
        assert!(store.latest_health_score().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gateway_error_status_is_unavailable() {
        // ---
        let (pipeline, store, _) = setup(StatusCode::SERVICE_UNAVAILABLE, String::new()).await;

        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::GatewayUnavailable(_)));
        assert!(store.latest_reading().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gateway_timeout_writes_nothing() {
        // ---
        async fn stall() -> String {
            tokio::time::sleep(Duration::from_secs(3)).await;
            feed_body("2025-10-01T06:15:00Z", "100", "80", "90", "700")
        }

        let app = Router::new().route("/channels/1/feeds.json", get(stall));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let url = format!("http://{addr}/channels/1/feeds.json");
        let feed = FeedClient::new(url, None, 1, Duration::from_millis(300)).unwrap();
        let store = Arc::new(MemoryStore::default());
        let repo = Repository::new(store.clone(), Publisher::default());
        let pipeline = Pipeline::new(feed, Arc::new(Thresholds::default()), repo);

        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::GatewayUnavailable(_)));
        assert!(store.latest_reading().await.unwrap().is_none());
        assert!(store.latest_health_score().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_feed_is_malformed() {
        // ---
        let (pipeline, _, _) = setup(StatusCode::OK, r#"{"feeds": []}"#.to_string()).await;
        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::GatewayMalformed(_)));
    }

    #[tokio::test]
    async fn test_repeated_entry_is_accepted_older_is_rejected() {
        // ---
        let body = feed_body("2025-10-01T06:15:00Z", "100", "80", "90", "700");
        let (pipeline, store, reply) = setup(StatusCode::OK, body).await;

        pipeline.run_cycle().await.unwrap();
        pipeline.run_cycle().await.unwrap();
        assert_eq!(store.health_score_history(10).await.unwrap().len(), 2);

        reply.lock().unwrap().1 = feed_body("2025-10-01T05:00:00Z", "100", "80", "90", "700");
        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::GatewayMalformed(_)));
        assert_eq!(store.health_score_history(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_cycles_both_complete() {
        // ---
        let body = feed_body("2025-10-01T06:15:00Z", "100", "80", "90", "700");
        let (pipeline, store, _) = setup(StatusCode::OK, body).await;

        let (a, b) = tokio::join!(pipeline.run_cycle(), pipeline.run_cycle());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(store.health_score_history(10).await.unwrap().len(), 2);
    }
}
