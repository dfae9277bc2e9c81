//! The authoritative threshold table.
//!
//! Both the evaluator and the scorer classify substances through
//! [`Thresholds::classify`], so alerts and score factors can never disagree
//! for a given reading.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{FactorStatus, Substance, SubstanceRange};

// ---

/// Default very-high bound shared by nitrogen, phosphorus and potassium.
pub const DEFAULT_NPK_VERY_HIGH: f64 = 200.0;

/// Ideal ranges plus the combined NPK very-high bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    // ---
    pub ranges: Vec<SubstanceRange>,
    pub npk_very_high: f64,

    /// Whether moisture above its band raises a critical alert. Never affects
    /// the score.
    #[serde(default = "default_true")]
    pub moisture_high_alert: bool,
}

fn default_true() -> bool {
    true
}

fn range(substance: Substance, low: f64, high: f64, unit: &str) -> SubstanceRange {
    SubstanceRange {
        substance,
        low,
        high,
        unit: unit.to_string(),
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        // ---
        Self {
            ranges: vec![
                range(Substance::Nitrogen, 20.0, 150.0, "ppm"),
                range(Substance::Phosphorus, 20.0, 150.0, "ppm"),
                range(Substance::Potassium, 20.0, 150.0, "ppm"),
                range(Substance::Moisture, 500.0, 1000.0, "raw"),
                range(Substance::Temperature, 10.0, 40.0, "°C"),
                range(Substance::Humidity, 30.0, 90.0, "%"),
                range(Substance::ElectricalConductivity, 0.2, 2.0, "dS/m"),
            ],
            npk_very_high: DEFAULT_NPK_VERY_HIGH,
            moisture_high_alert: true,
        }
    }
}

impl Thresholds {
    /// Load a table from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        // ---
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ranges file {}", path.display()))?;
        let table: Thresholds = serde_json::from_str(&text)
            .with_context(|| format!("Invalid ranges file {}", path.display()))?;
        table.validate()?;
        Ok(table)
    }

    /// Reject tables the evaluator and scorer cannot work with.
    pub fn validate(&self) -> Result<()> {
        // ---
        for r in &self.ranges {
            if !(r.low.is_finite() && r.high.is_finite()) || r.low > r.high {
                bail!("Invalid range for {}: [{}, {}]", r.substance, r.low, r.high);
            }
        }

        for substance in Substance::ALL {
            if self.ranges.iter().filter(|r| r.substance == substance).count() > 1 {
                bail!("Duplicate range for {}", substance);
            }
        }

        let scored = [
            Substance::Nitrogen,
            Substance::Phosphorus,
            Substance::Potassium,
            Substance::Moisture,
        ];
        for substance in scored {
            if self.range_for(substance).is_none() {
                bail!("Missing required range for {}", substance);
            }
        }

        for substance in Substance::NPK {
            let r = self
                .range_for(substance)
                .ok_or_else(|| anyhow!("Missing required range for {}", substance))?;
            if self.npk_very_high < r.high {
                bail!(
                    "NPK very-high threshold {} is below the {} high bound {}",
                    self.npk_very_high,
                    substance,
                    r.high
                );
            }
        }

        Ok(())
    }

    pub fn range_for(&self, substance: Substance) -> Option<&SubstanceRange> {
        self.ranges.iter().find(|r| r.substance == substance)
    }

    /// Classify `value` for `substance`; `None` when no range is configured.
    ///
    /// Comparisons are strict, so boundary values are `Ok`. For the NPK
    /// substances `High` means above the very-high threshold, which is the
    /// only excess that alerts or costs score.
    pub fn classify(&self, substance: Substance, value: f64) -> Option<FactorStatus> {
        // ---
        let r = self.range_for(substance)?;
        let ceiling = if substance.is_npk() {
            self.npk_very_high
        } else {
            r.high
        };

        let status = if value < r.low {
            FactorStatus::Low
        } else if value > ceiling {
            FactorStatus::High
        } else {
            FactorStatus::Ok
        };
        Some(status)
    }
}
