//! Postgres-backed [`Store`].
//!
//! Tables are created by [`crate::schema::create_schema`]. Every row gets a
//! server-assigned `inserted_at`, which is what "latest" means here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::error::StoreError;
use crate::models::{Alert, FactorStatus, HealthScore, SensorReading, Substance};

// ---

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    kind: String,
    message: String,
    severity: String,
    resolved: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            kind: row.kind.parse().map_err(StoreError::CorruptRow)?,
            message: row.message,
            severity: row.severity.parse().map_err(StoreError::CorruptRow)?,
            resolved: row.resolved,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HealthScoreRow {
    score: i16,
    factors: Json<BTreeMap<Substance, FactorStatus>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HealthScoreRow> for HealthScore {
    type Error = StoreError;

    fn try_from(row: HealthScoreRow) -> Result<Self, Self::Error> {
        let score = u8::try_from(row.score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| StoreError::CorruptRow(format!("score out of range: {}", row.score)))?;

        Ok(HealthScore {
            score,
            factors: row.factors.0,
            created_at: row.created_at,
        })
    }
}

const READING_COLUMNS: &str = "entry_id, nitrogen, phosphorus, potassium, moisture, \
     temperature, humidity, electrical_conductivity, created_at";

const ALERT_COLUMNS: &str = "id, type AS kind, message, severity, resolved, created_at";

/// Transaction-scoped advisory lock key guarding `sensor_readings` inserts.
const READING_INSERT_LOCK: i64 = 0x6677_7264; // "fwrd"

#[async_trait]
impl Store for PgStore {
    async fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        // ---
        let mut tx = self.pool.begin().await?;

        // Serializes reading inserts so the ordering check and the insert
        // see the same "latest" row.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(READING_INSERT_LOCK)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO sensor_readings (
                entry_id, nitrogen, phosphorus, potassium, moisture,
                temperature, humidity, electrical_conductivity, created_at,
                inserted_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, clock_timestamp()
            WHERE $9 >= COALESCE((SELECT max(created_at) FROM sensor_readings), $9)
            "#,
        )
        .bind(reading.entry_id)
        .bind(reading.nitrogen)
        .bind(reading.phosphorus)
        .bind(reading.potassium)
        .bind(reading.moisture)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.electrical_conductivity)
        .bind(reading.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Dropping `tx` rolls back and releases the lock.
            return Err(StoreError::OutOfOrder(format!(
                "reading at {} predates latest stored reading",
                reading.created_at
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        // ---
        let mut tx = self.pool.begin().await?;

        for alert in alerts {
            sqlx::query(
                r#"
                INSERT INTO alerts (id, type, message, severity, resolved, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(alert.id)
            .bind(alert.kind.as_str())
            .bind(&alert.message)
            .bind(alert.severity.as_str())
            .bind(alert.resolved)
            .bind(alert.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_health_score(&self, score: &HealthScore) -> Result<(), StoreError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO health_scores (score, factors, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(i16::from(score.score))
        .bind(Json(&score.factors))
        .bind(score.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<SensorReading>, StoreError> {
        // ---
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM sensor_readings \
             ORDER BY inserted_at DESC, id DESC LIMIT 1"
        );
        let reading = sqlx::query_as::<_, SensorReading>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reading)
    }

    async fn latest_alerts(&self, limit: u32) -> Result<Vec<Alert>, StoreError> {
        // ---
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             ORDER BY inserted_at DESC, seq DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn latest_health_score(&self) -> Result<Option<HealthScore>, StoreError> {
        Ok(self.health_score_history(1).await?.into_iter().next())
    }

    async fn health_score_history(&self, limit: u32) -> Result<Vec<HealthScore>, StoreError> {
        // ---
        let rows = sqlx::query_as::<_, HealthScoreRow>(
            r#"
            SELECT score, factors, created_at FROM health_scores
            ORDER BY inserted_at DESC, id DESC LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HealthScore::try_from).collect()
    }

    async fn resolve_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        // ---
        let sql = format!("UPDATE alerts SET resolved = TRUE WHERE id = $1 RETURNING {ALERT_COLUMNS}");
        let row = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Alert::try_from).transpose()
    }
}
