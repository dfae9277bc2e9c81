//! Application entry point for the `fieldwatch` service.
//!
//! This binary orchestrates the full startup sequence for the field telemetry
//! pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the store (PostgreSQL when `DATABASE_URL` is set, memory otherwise)
//! - Creating the database schema if it does not exist
//! - Optionally ticking the pipeline on a fixed interval
//! - Mounting all API routes via the `routes` gateway and serving requests
//!
//! # Environment Variables
//! - `GATEWAY_URL` (**required**) – telemetry gateway feed URL
//! - `DATABASE_URL` (optional) – PostgreSQL connection string
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the full list.
use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use fieldwatch::feed::FeedClient;
use fieldwatch::store::{MemoryStore, PgStore, Publisher, Repository, Store};
use fieldwatch::{config, routes, schema, Config, Pipeline};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let thresholds = Arc::new(cfg.thresholds()?);
    let store = open_store(&cfg).await?;

    let feed = FeedClient::new(
        cfg.gateway_url.clone(),
        cfg.gateway_api_key.clone(),
        cfg.gateway_results,
        Duration::from_secs(u64::from(cfg.gateway_timeout_secs)),
    )?;

    let repo = Repository::new(store, Publisher::default());
    let pipeline = Pipeline::new(feed, thresholds, repo);

    if cfg.refresh_interval_secs > 0 {
        spawn_scheduler(pipeline.clone(), cfg.refresh_interval_secs);
    }

    // Build app from routes gateway
    let app: Router = routes::router(pipeline);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.bind_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Connect to PostgreSQL and ensure the schema, or fall back to memory.
async fn open_store(cfg: &Config) -> Result<Arc<dyn Store>> {
    // ---
    let Some(db_url) = &cfg.db_url else {
        tracing::warn!("DATABASE_URL not set; readings will not survive a restart");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        return Ok(store);
    };

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    Ok(store)
}

/// Run one independent cycle per tick. Cycles may overlap; failures are
/// logged and left for the next tick.
fn spawn_scheduler(pipeline: Pipeline, every_secs: u32) {
    // ---
    tracing::info!("Scheduling a refresh every {}s", every_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(u64::from(every_secs)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                if let Err(e) = pipeline.run_cycle().await {
                    tracing::error!("Scheduled cycle failed: {}", e);
                }
            });
        }
    });
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `AXUM_LOG_LEVEL` env var
///
/// Called once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
