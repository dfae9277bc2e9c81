//! Turn a raw gateway payload into a typed [`SensorReading`].
//!
//! Pure: the same payload always yields the same reading. Channels the
//! gateway does not supply get a fixed fallback so consumers never deal with
//! missing values.

use chrono::{DateTime, Utc};

use crate::error::PipelineError;
use crate::feed::{FeedEntry, RawFeedPayload};
use crate::models::{SensorReading, Substance};

// ---

/// Temperature used when the gateway has no temperature channel (°C).
pub const FALLBACK_TEMPERATURE: f64 = 25.5;

/// Humidity used when the gateway has no humidity channel (%).
pub const FALLBACK_HUMIDITY: f64 = 65.0;

/// Conductivity used when the gateway has no conductivity channel (dS/m).
pub const FALLBACK_ELECTRICAL_CONDUCTIVITY: f64 = 1.2;

/// Gateway field carrying each substance.
pub fn field_for(substance: Substance) -> &'static str {
    match substance {
        Substance::Nitrogen => "field1",
        Substance::Phosphorus => "field2",
        Substance::Potassium => "field3",
        Substance::Moisture => "field4",
        Substance::Temperature => "field5",
        Substance::Humidity => "field6",
        Substance::ElectricalConductivity => "field7",
    }
}

/// Normalize the most recent data point of `payload`.
pub fn normalize(payload: &RawFeedPayload) -> Result<SensorReading, PipelineError> {
    // ---
    let entry = payload
        .latest()
        .ok_or_else(|| PipelineError::Normalization("payload has no data points".into()))?;

    let created_at = entry.created_at.ok_or_else(|| {
        PipelineError::Normalization("data point has no created_at timestamp".into())
    })?;

    normalize_entry(entry, created_at)
}

fn normalize_entry(
    entry: &FeedEntry,
    created_at: DateTime<Utc>,
) -> Result<SensorReading, PipelineError> {
    // ---
    Ok(SensorReading {
        entry_id: entry.entry_id,
        nitrogen: required(entry, Substance::Nitrogen)?,
        phosphorus: required(entry, Substance::Phosphorus)?,
        potassium: required(entry, Substance::Potassium)?,
        moisture: required(entry, Substance::Moisture)?,
        temperature: optional(entry, Substance::Temperature, FALLBACK_TEMPERATURE)?,
        humidity: optional(entry, Substance::Humidity, FALLBACK_HUMIDITY)?,
        electrical_conductivity: optional(
            entry,
            Substance::ElectricalConductivity,
            FALLBACK_ELECTRICAL_CONDUCTIVITY,
        )?,
        created_at,
    })
}

fn required(entry: &FeedEntry, substance: Substance) -> Result<f64, PipelineError> {
    // ---
    field_value(entry, substance)?.ok_or_else(|| {
        PipelineError::Normalization(format!(
            "missing {} ({})",
            substance,
            field_for(substance)
        ))
    })
}

fn optional(entry: &FeedEntry, substance: Substance, fallback: f64) -> Result<f64, PipelineError> {
    Ok(field_value(entry, substance)?.unwrap_or(fallback))
}

/// `Ok(None)` when the field is absent, null or blank.
fn field_value(entry: &FeedEntry, substance: Substance) -> Result<Option<f64>, PipelineError> {
    // ---
    let field = field_for(substance);
    let parsed = match entry.fields.get(field) {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(_) => None,
    };

    let value = parsed.filter(|v| v.is_finite()).ok_or_else(|| {
        PipelineError::Normalization(format!("{} ({}) is not a number", substance, field))
    })?;

    if value < 0.0 {
        return Err(PipelineError::Normalization(format!(
            "{} ({}) is negative: {}",
            substance, field, value
        )));
    }

    Ok(Some(value))
}
