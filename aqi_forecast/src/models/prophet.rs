//! Prophet-style decomposable model
//!
//! The prediction is the sum of a piecewise-linear trend, Fourier
//! seasonalities and standardized extra regressors:
//!
//! ```text
//! yhat(t) = trend(t) * (1 + multiplicative(t)) + additive(t)
//! ```
//!
//! Fitting happens offline; this module only evaluates a fitted model read
//! from its JSON artifact.

use crate::config::{City, RegressorSet};
use crate::error::{ForecastError, Result};
use crate::models::TrainedModel;
use crate::regressors::RegressorVector;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How a seasonal or regressor component combines with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentMode {
    /// Added to the trend
    #[default]
    Additive,
    /// Scales the trend
    Multiplicative,
}

/// A trend changepoint: the growth rate changes by `delta` from `date` on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changepoint {
    pub date: NaiveDate,
    pub delta: f64,
}

/// Piecewise-linear trend, in AQI units per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Origin of the trend's time axis
    pub start: NaiveDate,
    /// Base growth rate
    pub k: f64,
    /// Offset at `start`
    pub m: f64,
    #[serde(default)]
    pub changepoints: Vec<Changepoint>,
}

impl Trend {
    fn at(&self, date: NaiveDate) -> f64 {
        let t = days_between(self.start, date);
        let mut k = self.k;
        let mut m = self.m;

        // Offsets keep the trend continuous at each changepoint.
        for cp in self.changepoints.iter().take_while(|cp| cp.date <= date) {
            let s = days_between(self.start, cp.date);
            k += cp.delta;
            m -= s * cp.delta;
        }

        k * t + m
    }
}

/// A Fourier seasonality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    /// Period in days
    pub period: f64,
    pub fourier_order: usize,
    /// `2 * fourier_order` coefficients ordered sin1, cos1, sin2, cos2, ...
    pub coefficients: Vec<f64>,
    /// Overrides the model-wide seasonality mode
    #[serde(default)]
    pub mode: Option<ComponentMode>,
}

impl Seasonality {
    fn at(&self, date: NaiveDate) -> f64 {
        let t = days_since_epoch(date);

        (1..=self.fourier_order)
            .map(|n| {
                let x = 2.0 * PI * n as f64 * t / self.period;
                let i = 2 * (n - 1);
                self.coefficients[i] * x.sin() + self.coefficients[i + 1] * x.cos()
            })
            .sum()
    }
}

/// An extra regressor, standardized with its training mean and deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraRegressor {
    pub name: String,
    pub mu: f64,
    pub std: f64,
    pub coefficient: f64,
    /// Overrides the model-wide seasonality mode
    #[serde(default)]
    pub mode: Option<ComponentMode>,
}

impl ExtraRegressor {
    fn effect(&self, value: f64) -> f64 {
        (value - self.mu) / self.std * self.coefficient
    }
}

/// A fitted Prophet-style model for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphetModel {
    /// City the model was trained for
    pub city: String,
    /// Model version tag
    pub version: String,
    /// Last date covered by the training data
    pub history_end: NaiveDate,
    /// Default mode of seasonalities and regressors
    #[serde(default)]
    pub seasonality_mode: ComponentMode,
    pub trend: Trend,
    #[serde(default)]
    pub seasonalities: Vec<Seasonality>,
    #[serde(default)]
    pub regressors: Vec<ExtraRegressor>,
    #[serde(skip)]
    regressor_names: Vec<String>,
}

impl ProphetModel {
    /// A model with a linear trend and no seasonalities or regressors
    pub fn linear(
        city: impl Into<String>,
        version: impl Into<String>,
        history_end: NaiveDate,
        k: f64,
        m: f64,
    ) -> Self {
        Self {
            city: city.into(),
            version: version.into(),
            history_end,
            seasonality_mode: ComponentMode::Additive,
            trend: Trend {
                start: history_end,
                k,
                m,
                changepoints: Vec::new(),
            },
            seasonalities: Vec::new(),
            regressors: Vec::new(),
            regressor_names: Vec::new(),
        }
    }

    /// Builder-style trend origin
    pub fn with_trend_start(mut self, start: NaiveDate) -> Self {
        self.trend.start = start;
        self
    }

    /// Builder-style changepoint
    pub fn with_changepoint(mut self, date: NaiveDate, delta: f64) -> Self {
        self.trend.changepoints.push(Changepoint { date, delta });
        self.trend.changepoints.sort_by_key(|cp| cp.date);
        self
    }

    /// Builder-style seasonality using the model-wide mode
    pub fn with_seasonality(
        mut self,
        name: impl Into<String>,
        period: f64,
        coefficients: Vec<f64>,
    ) -> Self {
        self.seasonalities.push(Seasonality {
            name: name.into(),
            period,
            fourier_order: coefficients.len() / 2,
            coefficients,
            mode: None,
        });
        self
    }

    /// Builder-style additive regressor
    pub fn with_regressor(mut self, name: impl Into<String>, mu: f64, std: f64, coefficient: f64) -> Self {
        let name = name.into();
        self.regressor_names.push(name.clone());
        self.regressors.push(ExtraRegressor {
            name,
            mu,
            std,
            coefficient,
            mode: None,
        });
        self
    }

    /// Builder-style seasonality mode
    pub fn with_seasonality_mode(mut self, mode: ComponentMode) -> Self {
        self.seasonality_mode = mode;
        self
    }

    /// Check the model against the key it was requested under and the
    /// configured regressor set
    pub fn validated(mut self, city: &City, version: &str, regressors: &RegressorSet) -> Result<Self> {
        let load_error = |msg: String| {
            ForecastError::ModelLoadError(format!("{city} model {version}: {msg}"))
        };

        if !self.city.eq_ignore_ascii_case(city.as_str()) {
            return Err(load_error(format!("artifact was trained for '{}'", self.city)));
        }
        if self.version != version {
            return Err(load_error(format!("artifact has version '{}'", self.version)));
        }
        if !(self.trend.k.is_finite() && self.trend.m.is_finite()) {
            return Err(load_error("trend parameters are not finite".to_string()));
        }

        let names: Vec<&str> = self.regressors.iter().map(|r| r.name.as_str()).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(load_error(format!("regressor '{name}' appears more than once")));
            }
        }
        let missing = regressors.missing_from(names.iter().copied());
        let unexpected = regressors.unexpected_in(names.iter().copied());
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(load_error(format!(
                "regressors [{}] do not match configured [{}]",
                names.join(", "),
                regressors.names().join(", ")
            )));
        }

        for regressor in &self.regressors {
            if !(regressor.std.is_finite() && regressor.std > 0.0) {
                return Err(load_error(format!(
                    "regressor '{}' has non-positive std {}",
                    regressor.name, regressor.std
                )));
            }
        }

        for seasonality in &self.seasonalities {
            if !(seasonality.period.is_finite() && seasonality.period > 0.0) {
                return Err(load_error(format!(
                    "seasonality '{}' has non-positive period {}",
                    seasonality.name, seasonality.period
                )));
            }
            if seasonality.coefficients.len() != 2 * seasonality.fourier_order {
                return Err(load_error(format!(
                    "seasonality '{}' has {} coefficients, expected {}",
                    seasonality.name,
                    seasonality.coefficients.len(),
                    2 * seasonality.fourier_order
                )));
            }
        }

        if let Some(cp) = self.trend.changepoints.iter().find(|cp| cp.date < self.trend.start) {
            return Err(load_error(format!(
                "changepoint {} precedes trend start {}",
                cp.date, self.trend.start
            )));
        }
        self.trend.changepoints.sort_by_key(|cp| cp.date);
        self.regressor_names = self.regressors.iter().map(|r| r.name.clone()).collect();

        Ok(self)
    }

    fn mode_of(&self, mode: Option<ComponentMode>) -> ComponentMode {
        mode.unwrap_or(self.seasonality_mode)
    }

    fn check_regressors(&self, date: NaiveDate, regressors: &RegressorVector) -> Result<()> {
        let missing: Vec<&str> = self
            .regressors
            .iter()
            .map(|r| r.name.as_str())
            .filter(|name| regressors.get(name).is_none())
            .collect();
        let unexpected: Vec<&str> = regressors
            .names()
            .filter(|name| !self.regressors.iter().any(|r| r.name == *name))
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }

        Err(ForecastError::RegressorUnavailableError(format!(
            "{} on {date}: missing [{}]; unexpected [{}]",
            self.city,
            missing.join(", "),
            unexpected.join(", ")
        )))
    }
}

impl TrainedModel for ProphetModel {
    fn predict(&self, date: NaiveDate, regressors: &RegressorVector) -> Result<f64> {
        self.check_regressors(date, regressors)?;

        let mut additive = 0.0;
        let mut multiplicative = 0.0;

        for seasonality in &self.seasonalities {
            let value = seasonality.at(date);
            match self.mode_of(seasonality.mode) {
                ComponentMode::Additive => additive += value,
                ComponentMode::Multiplicative => multiplicative += value,
            }
        }

        for regressor in &self.regressors {
            let x = regressors.get(&regressor.name).unwrap_or_default();
            if !x.is_finite() {
                return Err(ForecastError::ValidationError(format!(
                    "regressor '{}' on {date} is not finite: {x}",
                    regressor.name
                )));
            }
            let value = regressor.effect(x);
            match self.mode_of(regressor.mode) {
                ComponentMode::Additive => additive += value,
                ComponentMode::Multiplicative => multiplicative += value,
            }
        }

        Ok(self.trend.at(date) * (1.0 + multiplicative) + additive)
    }

    fn regressor_names(&self) -> &[String] {
        &self.regressor_names
    }

    fn history_end(&self) -> NaiveDate {
        self.history_end
    }

    fn name(&self) -> &str {
        "Prophet"
    }
}

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

fn days_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64
}
