//! Health-risk warnings from individual pollutant readings
//!
//! Thresholds are derived from the CPCB NAQI breakpoints. Only the most severe
//! threshold met by each pollutant produces a warning.

use crate::calculator::Pollutant;
use crate::scale::RiskLevel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const SEVERE_RISK: &str =
    "Serious respiratory impact on healthy people. Serious aggravation of heart or lung disease.";
const VERY_POOR_RISK: &str = "Respiratory illness on prolonged exposure. Effect may be pronounced in people with heart/lung diseases.";
const POOR_RISK: &str =
    "Breathing discomfort to people on prolonged exposure, and discomfort to people with heart disease.";
const MODERATE_RISK: &str = "Breathing discomfort to people with lung disease (e.g., asthma) and heart disease, children, older adults.";

/// Threshold at or above which a warning of the given severity applies
#[derive(Debug, Clone, Copy)]
struct Threshold {
    value: f64,
    severity: RiskLevel,
    risk: &'static str,
}

const fn threshold(value: f64, severity: RiskLevel, risk: &'static str) -> Threshold {
    Threshold {
        value,
        severity,
        risk,
    }
}

/// Per-pollutant thresholds, most severe first
const HEALTH_THRESHOLDS: [(Pollutant, [Threshold; 4]); 6] = [
    (
        Pollutant::Pm25,
        [
            threshold(251.0, RiskLevel::Severe, SEVERE_RISK),
            threshold(121.0, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(91.0, RiskLevel::Poor, POOR_RISK),
            threshold(61.0, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
    (
        Pollutant::Pm10,
        [
            threshold(431.0, RiskLevel::Severe, SEVERE_RISK),
            threshold(351.0, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(251.0, RiskLevel::Poor, POOR_RISK),
            threshold(101.0, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
    (
        Pollutant::O3,
        [
            threshold(749.0, RiskLevel::Severe, SEVERE_RISK),
            threshold(209.0, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(169.0, RiskLevel::Poor, POOR_RISK),
            threshold(101.0, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
    (
        Pollutant::No2,
        [
            threshold(401.0, RiskLevel::Severe, SEVERE_RISK),
            threshold(281.0, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(181.0, RiskLevel::Poor, POOR_RISK),
            threshold(81.0, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
    (
        Pollutant::So2,
        [
            threshold(1601.0, RiskLevel::Severe, SEVERE_RISK),
            threshold(801.0, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(381.0, RiskLevel::Poor, POOR_RISK),
            threshold(81.0, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
    (
        Pollutant::Co,
        [
            threshold(
                34.1,
                RiskLevel::Severe,
                "Serious aggravation of heart or lung disease; may cause respiratory effects even during light activity.",
            ),
            threshold(17.1, RiskLevel::VeryPoor, VERY_POOR_RISK),
            threshold(10.1, RiskLevel::Poor, POOR_RISK),
            threshold(2.1, RiskLevel::Moderate, MODERATE_RISK),
        ],
    ),
];

/// A health warning triggered by one pollutant reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantRisk {
    /// Pollutant that triggered the warning
    pub pollutant: Pollutant,
    /// Reading that was evaluated
    pub value: f64,
    /// Severity of the highest threshold met
    pub severity: RiskLevel,
    /// Description of the health risk
    pub risk: &'static str,
}

impl fmt::Display for PollutantRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.pollutant.code().to_uppercase(),
            self.severity,
            self.risk
        )
    }
}

/// Identify health risks from individual pollutant readings
///
/// Readings are keyed by pollutant name (`pm25`, `PM2.5`, ...). Unknown names
/// and non-finite values are ignored. At most one warning is produced per
/// pollutant: the most severe threshold it meets.
pub fn interpret_pollutant_risks(readings: &BTreeMap<String, f64>) -> Vec<PollutantRisk> {
    let mut values: BTreeMap<Pollutant, f64> = BTreeMap::new();
    for (name, &value) in readings {
        match name.parse::<Pollutant>() {
            Ok(pollutant) if value.is_finite() => {
                values.insert(pollutant, value);
            }
            Ok(_) => tracing::warn!(pollutant = %name, value, "ignoring non-finite pollutant reading"),
            Err(_) => tracing::debug!(pollutant = %name, "no health thresholds for pollutant"),
        }
    }

    let mut risks = Vec::new();
    for (pollutant, thresholds) in HEALTH_THRESHOLDS.iter() {
        let Some(&value) = values.get(pollutant) else {
            continue;
        };

        if let Some(hit) = thresholds.iter().find(|t| value >= t.value) {
            tracing::info!(
                pollutant = %pollutant,
                value,
                threshold = hit.value,
                severity = %hit.severity,
                "pollutant health threshold exceeded"
            );
            risks.push(PollutantRisk {
                pollutant: *pollutant,
                value,
                severity: hit.severity,
                risk: hit.risk,
            });
        }
    }

    if risks.is_empty() {
        tracing::debug!("no pollutant health thresholds exceeded");
    }

    risks
}
