//! Residual corrector
//!
//! The difference between today's live AQI and the model's own estimate for
//! today is added to the baseline forecast, attenuated geometrically per day:
//!
//! ```text
//! corrected_i = max(0, baseline_i + (live - baseline_today) * decay^i)
//! ```
//!
//! with `i = 1` for the first future day. Without a live reading the baseline
//! passes through unchanged.

use crate::config::DecayFactor;
use crate::generator::{clamp_nonnegative, BaselinePoint};
use chrono::NaiveDate;
use serde::Serialize;

/// One forecast day after residual correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectedPoint {
    pub date: NaiveDate,
    pub baseline_aqi: f64,
    pub corrected_aqi: f64,
    /// Whether a residual was applied
    pub corrected: bool,
}

/// Residual inputs of one forecast request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualState {
    pub live_aqi: Option<f64>,
    pub baseline_today: f64,
    pub decay_factor: DecayFactor,
}

impl ResidualState {
    pub fn new(live_aqi: Option<f64>, baseline_today: f64, decay_factor: DecayFactor) -> Self {
        Self {
            live_aqi,
            baseline_today,
            decay_factor,
        }
    }

    /// `live_aqi - baseline_today`, if a live reading is available
    pub fn residual(&self) -> Option<f64> {
        self.live_aqi.map(|live| live - self.baseline_today)
    }

    /// Correction added on forecast day `day` (1-based)
    pub fn correction(&self, day: u32) -> Option<f64> {
        self.residual()
            .map(|residual| residual * self.decay_factor.weight(day))
    }

    /// Apply the correction to a baseline series
    pub fn apply(&self, baseline: &[BaselinePoint]) -> Vec<CorrectedPoint> {
        baseline
            .iter()
            .zip(1u32..)
            .map(|(point, day)| match self.correction(day) {
                Some(correction) => CorrectedPoint {
                    date: point.date,
                    baseline_aqi: point.baseline_aqi,
                    corrected_aqi: clamp_nonnegative(point.baseline_aqi + correction),
                    corrected: true,
                },
                None => CorrectedPoint {
                    date: point.date,
                    baseline_aqi: point.baseline_aqi,
                    corrected_aqi: point.baseline_aqi,
                    corrected: false,
                },
            })
            .collect()
    }
}

/// Correct a baseline series with today's residual
pub fn correct(
    baseline: &[BaselinePoint],
    baseline_today: f64,
    live_aqi: Option<f64>,
    decay_factor: DecayFactor,
) -> Vec<CorrectedPoint> {
    let state = ResidualState::new(live_aqi, baseline_today, decay_factor);

    match state.residual() {
        Some(residual) => tracing::info!(
            baseline_today,
            residual,
            decay = decay_factor.value(),
            "applying residual correction"
        ),
        None => tracing::warn!("no live AQI available, forecast is uncorrected"),
    }

    state.apply(baseline)
}

/// Pass a baseline series through without correction
pub fn uncorrected(baseline: &[BaselinePoint]) -> Vec<CorrectedPoint> {
    baseline
        .iter()
        .map(|point| CorrectedPoint {
            date: point.date,
            baseline_aqi: point.baseline_aqi,
            corrected_aqi: point.baseline_aqi,
            corrected: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn baseline(values: &[f64]) -> Vec<BaselinePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();
        values
            .iter()
            .zip(0i64..)
            .map(|(v, i)| BaselinePoint {
                date: start + chrono::Duration::days(i),
                baseline_aqi: *v,
            })
            .collect()
    }

    #[test]
    fn test_decay_starts_at_first_future_day() {
        let decay = DecayFactor::new(0.5).unwrap();
        let points = correct(&baseline(&[100.0, 100.0]), 100.0, Some(140.0), decay);

        assert_relative_eq!(points[0].corrected_aqi, 120.0);
        assert_relative_eq!(points[1].corrected_aqi, 110.0);
        assert!(points.iter().all(|p| p.corrected));
    }

    #[test]
    fn test_decay_of_one_keeps_full_residual() {
        let decay = DecayFactor::new(1.0).unwrap();
        let points = correct(&baseline(&[80.0, 90.0, 70.0]), 60.0, Some(75.0), decay);

        let corrected: Vec<f64> = points.iter().map(|p| p.corrected_aqi).collect();
        assert_eq!(corrected, vec![95.0, 105.0, 85.0]);
    }

    #[test]
    fn test_large_negative_residual_is_clamped() {
        let decay = DecayFactor::new(0.9).unwrap();
        let points = correct(&baseline(&[50.0, 40.0]), 500.0, Some(10.0), decay);

        assert!(points.iter().all(|p| p.corrected_aqi == 0.0 && p.corrected));
    }

    #[test]
    fn test_uncorrected_passes_through() {
        let points = uncorrected(&baseline(&[42.0]));
        assert_eq!(points[0].corrected_aqi, 42.0);
        assert!(!points[0].corrected);
    }
}
