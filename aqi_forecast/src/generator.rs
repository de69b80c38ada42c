//! Forecast generator: baseline AQI series from a trained model

use crate::error::{ForecastError, Result};
use crate::models::TrainedModel;
use crate::regressors::RegressorVector;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Model output for one forecast day, before residual correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselinePoint {
    pub date: NaiveDate,
    pub baseline_aqi: f64,
}

/// Baseline series together with the model's estimate for today
///
/// `baseline_today` only feeds the residual corrector and is not part of the
/// returned forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineForecast {
    pub points: Vec<BaselinePoint>,
    pub(crate) baseline_today: f64,
}

impl BaselineForecast {
    pub(crate) fn baseline_today(&self) -> f64 {
        self.baseline_today
    }
}

/// Generate `num_days` baseline points starting at `start_date`
///
/// `regressors[i]` is used for `start_date + i`. The estimate for
/// `reference_today` uses `today_regressors`. Model outputs are clamped at
/// zero.
pub fn generate(
    model: &dyn TrainedModel,
    start_date: NaiveDate,
    num_days: usize,
    regressors: &[RegressorVector],
    reference_today: NaiveDate,
    today_regressors: &RegressorVector,
) -> Result<BaselineForecast> {
    if regressors.len() != num_days {
        return Err(ForecastError::RegressorUnavailableError(format!(
            "{} regressor vectors supplied for {num_days} forecast days",
            regressors.len()
        )));
    }

    let points = regressors
        .iter()
        .enumerate()
        .map(|(offset, vector)| {
            let date = start_date + Duration::days(offset as i64);
            let baseline_aqi = clamp_nonnegative(model.predict(date, vector)?);
            Ok(BaselinePoint { date, baseline_aqi })
        })
        .collect::<Result<Vec<_>>>()?;

    let baseline_today = clamp_nonnegative(model.predict(reference_today, today_regressors)?);

    tracing::debug!(
        model = model.name(),
        %start_date,
        num_days,
        %reference_today,
        baseline_today,
        "baseline forecast generated"
    );

    Ok(BaselineForecast {
        points,
        baseline_today,
    })
}

pub(crate) fn clamp_nonnegative(value: f64) -> f64 {
    value.max(0.0)
}
