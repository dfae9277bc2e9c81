//! In-memory [`Store`], used when no database is configured and in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::Store;
use crate::error::StoreError;
use crate::models::{Alert, HealthScore, SensorReading};

// ---

#[derive(Debug, Default)]
struct Collections {
    readings: Vec<SensorReading>,
    alerts: Vec<Alert>,
    health_scores: Vec<HealthScore>,
}

/// Append-only vectors behind one lock. Insertion order stands in for the
/// server-assigned creation time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> T {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

/// Last `limit` items, newest first.
fn newest<T: Clone>(items: &[T], limit: u32) -> Vec<T> {
    items.iter().rev().take(limit as usize).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        // ---
        self.with(|c| {
            if let Some(latest) = c.readings.last() {
                if reading.created_at < latest.created_at {
                    return Err(StoreError::OutOfOrder(format!(
                        "reading at {} predates latest stored reading at {}",
                        reading.created_at, latest.created_at
                    )));
                }
            }
            c.readings.push(reading.clone());
            Ok(())
        })
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        self.with(|c| c.alerts.extend_from_slice(alerts));
        Ok(())
    }

    async fn insert_health_score(&self, score: &HealthScore) -> Result<(), StoreError> {
        self.with(|c| c.health_scores.push(score.clone()));
        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError> {
        Ok(self.with(|c| c.readings.last().cloned()))
    }

    async fn latest_alerts(&self, limit: u32) -> Result<Vec<Alert>, StoreError> {
        Ok(self.with(|c| newest(&c.alerts, limit)))
    }

    async fn latest_health_score(&self) -> Result<Option<HealthScore>, StoreError> {
        Ok(self.with(|c| c.health_scores.last().cloned()))
    }

    async fn health_score_history(&self, limit: u32) -> Result<Vec<HealthScore>, StoreError> {
        Ok(self.with(|c| newest(&c.health_scores, limit)))
    }

    async fn resolve_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        // ---
        Ok(self.with(|c| {
            c.alerts.iter_mut().find(|a| a.id == id).map(|a| {
                a.resolved = true;
                a.clone()
            })
        }))
    }
}
