//! Aggregate health score from a fixed deduction table.

use std::collections::BTreeMap;

use crate::models::{FactorStatus, HealthScore, SensorReading, Substance};
use crate::ranges::Thresholds;

// ---

pub const BASE_SCORE: i32 = 100;
pub const MOISTURE_LOW_PENALTY: i32 = 30;
pub const NITROGEN_LOW_PENALTY: i32 = 15;
pub const PHOSPHORUS_LOW_PENALTY: i32 = 15;
pub const POTASSIUM_LOW_PENALTY: i32 = 15;
/// Charged once no matter how many NPK substances are very high.
pub const NPK_VERY_HIGH_PENALTY: i32 = 25;

/// Score `reading` against `thresholds`.
///
/// Deductions stack and the result is clamped at 0. `factors` holds one entry
/// per configured substance, classified exactly as the evaluator does.
pub fn score(reading: &SensorReading, thresholds: &Thresholds) -> HealthScore {
    // ---
    let factors: BTreeMap<Substance, FactorStatus> = thresholds
        .ranges
        .iter()
        .filter_map(|r| {
            thresholds
                .classify(r.substance, reading.value(r.substance))
                .map(|status| (r.substance, status))
        })
        .collect();

    let is = |substance: Substance, status: FactorStatus| factors.get(&substance) == Some(&status);

    let mut total = BASE_SCORE;
    if is(Substance::Moisture, FactorStatus::Low) {
        total -= MOISTURE_LOW_PENALTY;
    }
    if is(Substance::Nitrogen, FactorStatus::Low) {
        total -= NITROGEN_LOW_PENALTY;
    }
    if is(Substance::Phosphorus, FactorStatus::Low) {
        total -= PHOSPHORUS_LOW_PENALTY;
    }
    if is(Substance::Potassium, FactorStatus::Low) {
        total -= POTASSIUM_LOW_PENALTY;
    }
    if Substance::NPK.iter().any(|s| is(*s, FactorStatus::High)) {
        total -= NPK_VERY_HIGH_PENALTY;
    }

    HealthScore {
        score: total.clamp(0, BASE_SCORE) as u8,
        factors,
        created_at: reading.created_at,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::evaluate::tests::healthy_reading;

    #[test]
    fn test_healthy_reading_scores_full() {
        // ---
        let s = score(&healthy_reading(), &Thresholds::default());
        assert_eq!(s.score, 100);
        assert!(s.factors.values().all(|f| *f == FactorStatus::Ok));
        assert_eq!(s.factors.len(), Substance::ALL.len());
    }

    #[test]
    fn test_low_potassium_and_very_high_nitrogen() {
        // ---
        let reading = SensorReading {
            nitrogen: 255.0,
            phosphorus: 45.0,
            potassium: 5.0,
            ..healthy_reading()
        };
        let s = score(&reading, &Thresholds::default());

        assert_eq!(s.score, 60);
        assert_eq!(s.factors[&Substance::Nitrogen], FactorStatus::High);
        assert_eq!(s.factors[&Substance::Phosphorus], FactorStatus::Ok);
        assert_eq!(s.factors[&Substance::Potassium], FactorStatus::Low);
    }

    #[test]
    fn test_low_moisture_costs_thirty() {
        // ---
        let reading = SensorReading {
            moisture: 450.0,
            ..healthy_reading()
        };
        let s = score(&reading, &Thresholds::default());
        assert_eq!(s.score, 70);
        assert_eq!(s.factors[&Substance::Moisture], FactorStatus::Low);
    }

    #[test]
    fn test_high_moisture_costs_nothing() {
        // ---
        let reading = SensorReading {
            moisture: 1500.0,
            ..healthy_reading()
        };
        let s = score(&reading, &Thresholds::default());
        assert_eq!(s.score, 100);
        assert_eq!(s.factors[&Substance::Moisture], FactorStatus::High);
    }

    #[test]
    fn test_very_high_deducted_once() {
        // ---
        let reading = SensorReading {
            nitrogen: 201.0,
            phosphorus: 250.0,
            potassium: 999.0,
            ..healthy_reading()
        };
        assert_eq!(score(&reading, &Thresholds::default()).score, 75);
    }

    #[test]
    fn test_deductions_stack() {
        // ---
        let reading = SensorReading {
            nitrogen: 0.0,
            phosphorus: 0.0,
            potassium: 0.0,
            moisture: 0.0,
            ..healthy_reading()
        };
        let s = score(&reading, &Thresholds::default());
        assert_eq!(s.score, 25);

        let mut t = Thresholds::default();
        t.npk_very_high = 150.0;
        let reading = SensorReading {
            nitrogen: 0.0,
            phosphorus: 0.0,
            potassium: 500.0,
            moisture: 0.0,
            ..healthy_reading()
        };
        // 100 - 30 - 15 - 15 - 25
        assert_eq!(score(&reading, &t).score, 15);
    }

    #[test]
    fn test_environment_factors_do_not_deduct() {
        // ---
        let reading = SensorReading {
            temperature: 2.0,
            humidity: 99.0,
            ..healthy_reading()
        };
        let s = score(&reading, &Thresholds::default());
        assert_eq!(s.score, 100);
        assert_eq!(s.factors[&Substance::Temperature], FactorStatus::Low);
        assert_eq!(s.factors[&Substance::Humidity], FactorStatus::High);
    }

    #[test]
    fn test_score_is_deterministic() {
        // ---
        let reading = SensorReading {
            phosphorus: 3.0,
            ..healthy_reading()
        };
        let t = Thresholds::default();
        assert_eq!(score(&reading, &t), score(&reading, &t));
    }
}
