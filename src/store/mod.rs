//! Store & Publisher.
//!
//! Durable copies of readings, alerts and health scores live behind the
//! [`Store`] trait (Postgres in production, memory in tests and when no
//! database is configured). [`Repository`] pairs a store with a [`Publisher`]
//! so that every successful insert is fanned out to subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{PipelineError, StoreError};
use crate::models::{Alert, HealthScore, SensorReading};

mod memory;
mod postgres;
mod publisher;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use publisher::{ChangeNotification, EntityKind, Publisher, Subscription};

// ---

/// Append-only persistence for the three pipeline collections.
///
/// "Latest" reads are ordered by insertion time, newest first.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError>;

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError>;

    async fn insert_health_score(&self, score: &HealthScore) -> Result<(), StoreError>;

    async fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError>;

    async fn latest_alerts(&self, limit: u32) -> Result<Vec<Alert>, StoreError>;

    async fn latest_health_score(&self) -> Result<Option<HealthScore>, StoreError>;

    async fn health_score_history(&self, limit: u32) -> Result<Vec<HealthScore>, StoreError>;

    /// Operator action: mark an alert resolved. `None` if no such alert.
    async fn resolve_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError>;
}

/// A [`Store`] plus change notifications.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
    publisher: Publisher,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>, publisher: Publisher) -> Self {
        Self { store, publisher }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Register interest in insertions of `kind`.
    pub fn subscribe(&self, kind: EntityKind) -> Subscription {
        self.publisher.subscribe(kind)
    }

    /// Persist one cycle's output and notify subscribers.
    ///
    /// The reading is written first; if that fails nothing else is attempted.
    /// A reading older than the newest stored one is refused by the store and
    /// surfaces as [`PipelineError::GatewayMalformed`]. Alert and score writes are independent of each other: a failure in
    /// either is logged and reported, but earlier writes stay in place.
    pub async fn persist(
        &self,
        reading: &SensorReading,
        alerts: &[Alert],
        score: &HealthScore,
    ) -> Result<(), PipelineError> {
        // ---
        if let Err(e) = self.store.insert_reading(reading).await {
            if matches!(e, StoreError::OutOfOrder(_)) {
                warn!("Feed went backwards: {}", e);
            } else {
                error!("Failed to store reading: {}", e);
            }
            return Err(e.into());
        }
        self.publisher
            .publish(ChangeNotification::Reading(reading.clone()));

        let mut failure: Option<StoreError> = None;

        if !alerts.is_empty() {
            match self.store.insert_alerts(alerts).await {
                Ok(()) => {
                    for alert in alerts {
                        self.publisher
                            .publish(ChangeNotification::Alert(alert.clone()));
                    }
                }
                Err(e) => {
                    error!("Failed to store {} alert(s): {}", alerts.len(), e);
                    failure = Some(e);
                }
            }
        }

        match self.store.insert_health_score(score).await {
            Ok(()) => {
                self.publisher
                    .publish(ChangeNotification::HealthScore(score.clone()));
            }
            Err(e) => {
                error!("Failed to store health score: {}", e);
                failure.get_or_insert(e);
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => {
                debug!("Persisted reading, {} alert(s) and score", alerts.len());
                Ok(())
            }
        }
    }
}
