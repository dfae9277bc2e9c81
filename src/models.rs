//! Data models for the field telemetry pipeline.
//!
//! A [`SensorReading`] is produced once per ingestion cycle by the normalizer;
//! [`Alert`]s and a [`HealthScore`] are derived from it. All three are
//! immutable once created, with the single exception of [`Alert::resolved`],
//! which only an operator may flip.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---

/// A measured nutrient or environmental quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Substance {
    Nitrogen,
    Phosphorus,
    Potassium,
    Moisture,
    Temperature,
    Humidity,
    ElectricalConductivity,
}

impl Substance {
    /// Every substance, in display order.
    pub const ALL: [Substance; 7] = [
        Substance::Nitrogen,
        Substance::Phosphorus,
        Substance::Potassium,
        Substance::Moisture,
        Substance::Temperature,
        Substance::Humidity,
        Substance::ElectricalConductivity,
    ];

    /// The three macro-nutrients that share the very-high threshold.
    pub const NPK: [Substance; 3] = [
        Substance::Nitrogen,
        Substance::Phosphorus,
        Substance::Potassium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Substance::Nitrogen => "nitrogen",
            Substance::Phosphorus => "phosphorus",
            Substance::Potassium => "potassium",
            Substance::Moisture => "moisture",
            Substance::Temperature => "temperature",
            Substance::Humidity => "humidity",
            Substance::ElectricalConductivity => "electrical_conductivity",
        }
    }

    pub fn is_npk(&self) -> bool {
        Self::NPK.contains(self)
    }
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingestion cycle's measurements.
///
/// `created_at` is the gateway's timestamp for the data point, so the same
/// payload always normalizes to the same reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorReading {
    // ---
    /// Gateway-side sequence number of the data point, when supplied.
    pub entry_id: Option<i64>,
    /// ppm
    pub nitrogen: f64,
    /// ppm
    pub phosphorus: f64,
    /// ppm
    pub potassium: f64,
    /// Gateway-native raw units.
    pub moisture: f64,
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// dS/m
    pub electrical_conductivity: f64,
    pub created_at: DateTime<Utc>,
}

impl SensorReading {
    /// Value measured for `substance`.
    pub fn value(&self, substance: Substance) -> f64 {
        match substance {
            Substance::Nitrogen => self.nitrogen,
            Substance::Phosphorus => self.phosphorus,
            Substance::Potassium => self.potassium,
            Substance::Moisture => self.moisture,
            Substance::Temperature => self.temperature,
            Substance::Humidity => self.humidity,
            Substance::ElectricalConductivity => self.electrical_conductivity,
        }
    }
}

/// Ideal band for one substance. `low` and `high` are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceRange {
    pub substance: Substance,
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

/// Alert category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Npk,
    Irrigation,
    Environment,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Npk => "npk",
            AlertKind::Irrigation => "irrigation",
            AlertKind::Environment => "environment",
        }
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npk" => Ok(AlertKind::Npk),
            "irrigation" => Ok(AlertKind::Irrigation),
            "environment" => Ok(AlertKind::Environment),
            other => Err(format!("unknown alert type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// A detected out-of-range or combined condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// New unresolved alert stamped with the time of the reading that raised it.
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            severity,
            resolved: false,
            created_at,
        }
    }
}

/// Per-substance status used in [`HealthScore::factors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Ok,
    Low,
    High,
}

impl FactorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorStatus::Ok => "ok",
            FactorStatus::Low => "low",
            FactorStatus::High => "high",
        }
    }
}

/// Aggregate field condition at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// Always within `0..=100`.
    pub score: u8,
    pub factors: BTreeMap<Substance, FactorStatus>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_substance_serializes_snake_case() {
        // ---
        let json = serde_json::to_string(&Substance::ElectricalConductivity).unwrap();
        assert_eq!(json, "\"electrical_conductivity\"");
        assert_eq!(Substance::Moisture.as_str(), "moisture");
    }

    #[test]
    fn test_alert_wire_shape() {
        // ---
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 6, 0, 0).unwrap();
        let alert = Alert::new(
            AlertKind::Irrigation,
            Severity::Critical,
            "Moisture LOW → Turn ON irrigation",
            at,
        );

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "irrigation");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["resolved"], false);
    }

    #[test]
    fn test_factors_keyed_by_substance_name() {
        // ---
        let mut factors = BTreeMap::new();
        factors.insert(Substance::Potassium, FactorStatus::Low);
        let score = HealthScore {
            score: 85,
            factors,
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 6, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&score).unwrap();
        assert_eq!(value["factors"]["potassium"], "low");

        let back: HealthScore = serde_json::from_value(value).unwrap();
        assert_eq!(back, score);
    }

    #[test]
    fn test_enum_text_parsing() {
        // ---
        assert_eq!("critical".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!("npk".parse::<AlertKind>(), Ok(AlertKind::Npk));
        assert!("info".parse::<Severity>().is_err());
    }
}
