//! Forecast assembler: attaches health-risk categories to corrected points

use crate::corrector::CorrectedPoint;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use health_rules::{HealthRiskScale, RiskLevel};
use serde::Serialize;

/// A forecast day ready for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Model output before correction
    pub baseline_aqi: f64,
    pub corrected_aqi: f64,
    /// `corrected_aqi` rounded to the nearest integer
    pub predicted_aqi: u32,
    pub risk_category: RiskLevel,
    pub risk_implications: &'static str,
    /// Display colour of the risk category
    pub color: &'static str,
    pub corrected: bool,
}

/// Classify each corrected point, preserving date order
///
/// The rounded AQI is classified so the category always agrees with the
/// displayed value.
pub fn assemble(points: &[CorrectedPoint], scale: &HealthRiskScale) -> Result<Vec<ForecastPoint>> {
    points
        .iter()
        .map(|point| {
            let predicted_aqi = point.corrected_aqi.round();
            let category = scale.classify(predicted_aqi)?;
            if predicted_aqi > f64::from(u32::MAX) {
                return Err(ForecastError::ValidationError(format!(
                    "forecast AQI {} for {} is out of range",
                    point.corrected_aqi, point.date
                )));
            }

            Ok(ForecastPoint {
                date: point.date,
                baseline_aqi: point.baseline_aqi,
                corrected_aqi: point.corrected_aqi,
                predicted_aqi: predicted_aqi as u32,
                risk_category: category.level,
                risk_implications: category.implications,
                color: category.color,
                corrected: point.corrected,
            })
        })
        .collect()
}
