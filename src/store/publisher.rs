//! In-process publish/subscribe for insert notifications.
//!
//! Every subscriber owns a bounded queue that is filled with `try_send`, so
//! publishing never waits on a subscriber and a slow one cannot hold up the
//! others. Per-subscriber order is FIFO. Subscribers that have gone away are
//! pruned on the next publish; one that lets its queue fill up is dropped
//! (its stream ends after draining what was queued).

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{trace, warn};

use crate::models::{Alert, HealthScore, SensorReading};

// ---

/// Notifications a subscriber may have queued before it is dropped.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 1024;

/// Collection a subscriber can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Reading,
    Alert,
    HealthScore,
}

impl EntityKind {
    /// Backing collection name.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Reading => "sensor_readings",
            EntityKind::Alert => "alerts",
            EntityKind::HealthScore => "health_scores",
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the path segments used by the events endpoint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readings" | "sensor_readings" => Ok(EntityKind::Reading),
            "alerts" => Ok(EntityKind::Alert),
            "health-scores" | "health_scores" => Ok(EntityKind::HealthScore),
            other => Err(format!("unknown entity kind '{other}'")),
        }
    }
}

/// A newly inserted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangeNotification {
    Reading(SensorReading),
    Alert(Alert),
    HealthScore(HealthScore),
}

impl ChangeNotification {
    pub fn kind(&self) -> EntityKind {
        match self {
            ChangeNotification::Reading(_) => EntityKind::Reading,
            ChangeNotification::Alert(_) => EntityKind::Alert,
            ChangeNotification::HealthScore(_) => EntityKind::HealthScore,
        }
    }
}

/// Fan-out point shared by the repository and the subscription endpoints.
#[derive(Clone, Default)]
pub struct Publisher {
    subscribers: Arc<Mutex<Vec<(EntityKind, Sender<ChangeNotification>)>>>,
}

impl Publisher {
    pub fn subscribe(&self, kind: EntityKind) -> Subscription {
        // ---
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.lock().push((kind, tx));
        Subscription { kind, rx }
    }

    /// Deliver `change` to every live subscriber of its kind.
    pub fn publish(&self, change: ChangeNotification) {
        // ---
        let kind = change.kind();
        let mut subscribers = self.lock();
        subscribers.retain(|(k, tx)| {
            if *k != kind {
                return !tx.is_closed();
            }
            match tx.try_send(change.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Dropping {} subscriber: {} notifications unread",
                        kind.collection(),
                        SUBSCRIBER_QUEUE_CAPACITY
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
        trace!(
            "Published {} insert to {} subscriber(s)",
            kind.collection(),
            subscribers.iter().filter(|(k, _)| *k == kind).count()
        );
    }

    /// Number of registered subscribers for `kind`, including ones not yet
    /// pruned.
    pub fn subscriber_count(&self, kind: EntityKind) -> usize {
        self.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<(EntityKind, Sender<ChangeNotification>)>> {
        // A panic while holding the lock leaves the list itself intact.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of one registration. Dropping it unregisters.
#[derive(Debug)]
pub struct Subscription {
    kind: EntityKind,
    rx: Receiver<ChangeNotification>,
}

impl Subscription {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Wait for the next notification; `None` once the publisher is gone or
    /// has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        self.rx.recv().await
    }

    /// Next queued notification without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        self.rx.try_recv().ok()
    }
}
