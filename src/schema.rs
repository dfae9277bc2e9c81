//! Database schema management for `fieldwatch`.
//!
//! Ensures the three append-only collections exist before serving requests.
//! Applied once on startup from `main.rs` when a database is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `sensor_readings`, `alerts` and `health_scores`, each with a
/// server-assigned `inserted_at`. Safe to call on every startup; no-op if
/// objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id                      BIGSERIAL PRIMARY KEY,
            entry_id                BIGINT,
            nitrogen                DOUBLE PRECISION NOT NULL CHECK (nitrogen >= 0),
            phosphorus              DOUBLE PRECISION NOT NULL CHECK (phosphorus >= 0),
            potassium               DOUBLE PRECISION NOT NULL CHECK (potassium >= 0),
            moisture                DOUBLE PRECISION NOT NULL CHECK (moisture >= 0),
            temperature             DOUBLE PRECISION NOT NULL,
            humidity                DOUBLE PRECISION NOT NULL,
            electrical_conductivity DOUBLE PRECISION NOT NULL,
            created_at              TIMESTAMPTZ NOT NULL,
            inserted_at             TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id          UUID PRIMARY KEY,
            seq         BIGSERIAL,
            type        TEXT        NOT NULL,
            message     TEXT        NOT NULL,
            severity    TEXT        NOT NULL CHECK (severity IN ('warning', 'critical')),
            resolved    BOOLEAN     NOT NULL DEFAULT FALSE,
            created_at  TIMESTAMPTZ NOT NULL,
            inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS health_scores (
            id          BIGSERIAL PRIMARY KEY,
            score       SMALLINT    NOT NULL CHECK (score BETWEEN 0 AND 100),
            factors     JSONB       NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL,
            inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // "Most recent N" lookups
    for (index, table) in [
        ("idx_sensor_readings_inserted_at", "sensor_readings"),
        ("idx_alerts_inserted_at", "alerts"),
        ("idx_health_scores_inserted_at", "health_scores"),
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {table} (inserted_at DESC);"
        ))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
