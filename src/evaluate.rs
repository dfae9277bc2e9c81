//! Threshold evaluation: one reading in, zero or more alerts out.

use crate::models::{Alert, AlertKind, FactorStatus, SensorReading, Severity, Substance};
use crate::ranges::Thresholds;

// ---

/// Message raised once when any NPK substance exceeds the very-high bound.
pub const NPK_VERY_HIGH_MESSAGE: &str = "NPK VERY HIGH → Stop fertilizing";

/// Compare every configured substance against its band.
///
/// NPK excess is reported as a single combined critical alert; individual
/// low alerts are independent of it. An empty result is the common case.
pub fn evaluate(reading: &SensorReading, thresholds: &Thresholds) -> Vec<Alert> {
    // ---
    let mut alerts = Vec::new();
    let mut npk_very_high = false;

    for range in &thresholds.ranges {
        let substance = range.substance;
        let Some(status) = thresholds.classify(substance, reading.value(substance)) else {
            continue;
        };

        match status {
            FactorStatus::Ok => {}
            FactorStatus::High if substance.is_npk() => npk_very_high = true,
            FactorStatus::High
                if substance == Substance::Moisture && !thresholds.moisture_high_alert => {}
            status => {
                if let Some((kind, severity, message)) = rule(substance, status) {
                    alerts.push(Alert::new(kind, severity, message, reading.created_at));
                }
            }
        }
    }

    if npk_very_high {
        alerts.push(Alert::new(
            AlertKind::Npk,
            Severity::Critical,
            NPK_VERY_HIGH_MESSAGE,
            reading.created_at,
        ));
    }

    alerts
}

/// Alert raised for one substance in one non-ok state.
fn rule(substance: Substance, status: FactorStatus) -> Option<(AlertKind, Severity, &'static str)> {
    // ---
    use AlertKind::*;
    use FactorStatus::*;
    use Severity::*;

    let rule = match (substance, status) {
        (Substance::Nitrogen, Low) => (Npk, Warning, "Nitrogen LOW → Add Urea"),
        (Substance::Phosphorus, Low) => (Npk, Warning, "Phosphorus LOW → Add DAP"),
        (Substance::Potassium, Low) => (Npk, Warning, "Potassium LOW → Add Potash"),
        (Substance::Moisture, Low) => (Irrigation, Critical, "Moisture LOW → Turn ON irrigation"),
        (Substance::Moisture, High) => (Irrigation, Critical, "Moisture HIGH → Turn OFF irrigation"),
        (Substance::Temperature, Low) => {
            (Environment, Warning, "Temperature LOW → Protect crop from cold")
        }
        (Substance::Temperature, High) => (Environment, Warning, "Temperature HIGH → Provide shade"),
        (Substance::Humidity, Low) => (Environment, Warning, "Humidity LOW → Increase misting"),
        (Substance::Humidity, High) => (Environment, Warning, "Humidity HIGH → Improve ventilation"),
        (Substance::ElectricalConductivity, Low) => {
            (Environment, Warning, "Conductivity LOW → Apply balanced fertilizer")
        }
        (Substance::ElectricalConductivity, High) => {
            (Environment, Warning, "Conductivity HIGH → Flush soil salts")
        }
        _ => return None,
    };
    Some(rule)
}
