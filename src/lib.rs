//! Field telemetry ingestion and health scoring.
//!
//! An ingestion cycle fetches the latest data point from the telemetry
//! gateway ([`feed`]), normalizes it into a [`SensorReading`]
//! ([`normalize`]), derives alerts ([`evaluate`]) and a health score
//! ([`scoring`]) from the single threshold table in [`ranges`], and persists
//! and publishes all three ([`store`]). [`pipeline`] wires one cycle;
//! [`routes`] exposes the read API, manual refresh and change streams.
//! [`season`] is the crop calendar behind `GET /api/season`.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod feed;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod ranges;
pub mod routes;
pub mod schema;
pub mod scoring;
pub mod season;
pub mod store;

pub use config::Config;
pub use error::{PipelineError, StoreError};
pub use models::{
    Alert, AlertKind, FactorStatus, HealthScore, SensorReading, Severity, Substance,
    SubstanceRange,
};
pub use pipeline::{CycleOutcome, Pipeline};
pub use ranges::Thresholds;
