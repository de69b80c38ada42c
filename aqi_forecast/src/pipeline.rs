//! End-to-end forecast pipeline
//!
//! A request runs synchronously through: future regressors, model lookup,
//! baseline generation, residual correction, classification and assembly.
//! Missing future regressors or an unavailable model fail the request; a
//! missing live AQI only degrades it to an uncorrected forecast.

use crate::assembler::{assemble, ForecastPoint};
use crate::config::{City, ForecastConfig};
use crate::corrector::{correct, uncorrected};
use crate::error::{ForecastError, Result};
use crate::generator::generate;
use crate::registry::ModelRegistry;
use crate::regressors::RegressorProvider;
use crate::retry::{RetryPolicy, RetryingLiveAqi, RetryingWeather};
use crate::sources::{LiveAqiClient, WeatherClient};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use health_rules::{interpret_pollutant_risks, HealthRiskScale, PollutantRisk, RiskCategory, RiskLevel};
use serde::Serialize;
use std::sync::Arc;

/// Per-request overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    /// Forecast horizon; the configured `forecast_days` when `None`
    pub days: Option<usize>,
    /// Apply the live-AQI residual correction
    pub apply_residual_correction: bool,
    /// Live AQI known to the caller, used instead of querying the live client
    pub last_known_aqi: Option<f64>,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            days: None,
            apply_residual_correction: true,
            last_known_aqi: None,
        }
    }
}

/// How the residual correction was handled for a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Correction {
    /// The residual was applied with per-day decay
    Applied { residual: f64 },
    /// The caller turned correction off
    Disabled,
    /// No live AQI could be obtained; the forecast is uncorrected
    Unavailable { reason: String },
}

/// A complete forecast for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub city: City,
    pub generated_on: NaiveDate,
    pub live_aqi: Option<f64>,
    pub correction: Correction,
    pub points: Vec<ForecastPoint>,
}

/// Live conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub city: City,
    pub aqi: f64,
    pub risk_category: RiskLevel,
    pub risk_implications: &'static str,
    pub color: &'static str,
    pub pollutant_risks: Vec<PollutantRisk>,
    pub observed_at: DateTime<Utc>,
}

/// The forecasting service
pub struct Forecaster {
    config: ForecastConfig,
    registry: Arc<ModelRegistry>,
    regressors: RegressorProvider,
    live: Arc<dyn LiveAqiClient>,
    scale: HealthRiskScale,
    today: Option<NaiveDate>,
}

impl Forecaster {
    /// Create a forecaster; both collaborators are wrapped with the timeout
    /// and retry settings of their endpoint
    pub fn new(
        config: ForecastConfig,
        registry: Arc<ModelRegistry>,
        weather: Arc<dyn WeatherClient>,
        live: Arc<dyn LiveAqiClient>,
    ) -> Self {
        let weather: Arc<dyn WeatherClient> = Arc::new(RetryingWeather::new(
            weather,
            RetryPolicy::new("Weather", config.weather()),
        ));
        let live: Arc<dyn LiveAqiClient> = Arc::new(RetryingLiveAqi::new(
            live,
            RetryPolicy::new("AQICN", config.aqicn()),
        ));

        Self {
            regressors: RegressorProvider::new(weather, config.regressors().clone()),
            config,
            registry,
            live,
            scale: HealthRiskScale::cpcb(),
            today: None,
        }
    }

    /// Pin the current date instead of reading the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Use a custom health-risk scale
    pub fn with_scale(mut self, scale: HealthRiskScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// The date forecasts are made from
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Forecast the next days for a city with default options
    pub fn get_forecast(&self, city: &str) -> Result<Vec<ForecastPoint>> {
        Ok(self.forecast(city, &ForecastOptions::default())?.points)
    }

    /// Run the full forecast pipeline for a city
    pub fn forecast(&self, city: &str, options: &ForecastOptions) -> Result<ForecastReport> {
        let city = self.config.city(city)?;
        let days = options.days.unwrap_or_else(|| self.config.forecast_days());
        if days == 0 {
            return Err(ForecastError::ValidationError(
                "forecast horizon must be at least one day".to_string(),
            ));
        }

        let today = self.today();
        let start_date = today + Duration::days(1);
        tracing::info!(city = %city, %today, days, "forecast requested");

        let future = self.regressors.get_future_regressors(&city, start_date, days)?;
        let model = self
            .registry
            .get_model(&city, self.config.model_version())?;

        let history_end = model.history_end();
        let reference_today = if today < history_end {
            tracing::warn!(
                city = %city,
                %today,
                %history_end,
                "today precedes the end of the training history, using its last day as reference"
            );
            history_end
        } else {
            today
        };
        let today_regressors = self.regressors.get_today_regressors(&city)?;

        let baseline = generate(
            model.as_ref(),
            start_date,
            days,
            &future,
            reference_today,
            &today_regressors,
        )?;

        let (live_aqi, correction, corrected) = if options.apply_residual_correction {
            match self.live_aqi(&city, options.last_known_aqi)? {
                Ok(live) => {
                    let residual = live - baseline.baseline_today();
                    let points = correct(
                        &baseline.points,
                        baseline.baseline_today(),
                        Some(live),
                        self.config.decay_factor(),
                    );
                    (Some(live), Correction::Applied { residual }, points)
                }
                Err(reason) => {
                    tracing::warn!(city = %city, %reason, "showing uncorrected forecast");
                    let points = correct(
                        &baseline.points,
                        baseline.baseline_today(),
                        None,
                        self.config.decay_factor(),
                    );
                    (None, Correction::Unavailable { reason }, points)
                }
            }
        } else {
            tracing::debug!(city = %city, "residual correction disabled");
            (None, Correction::Disabled, uncorrected(&baseline.points))
        };

        let points = assemble(&corrected, &self.scale)?;
        tracing::info!(city = %city, points = points.len(), "forecast assembled");

        Ok(ForecastReport {
            city,
            generated_on: today,
            live_aqi,
            correction,
            points,
        })
    }

    /// Classify a live AQI value
    pub fn classify_current(&self, aqi: f64) -> Result<&'static RiskCategory> {
        Ok(self.scale.classify(aqi)?)
    }

    /// Live AQI, risk category and pollutant warnings for a city
    pub fn current_conditions(&self, city: &str) -> Result<CurrentConditions> {
        let city = self.config.city(city)?;
        let reading = self
            .live
            .fetch_current_aqi(&city)?
            .ok_or_else(|| ForecastError::api("AQICN", format!("no AQI reported for {city}")))?;

        let category = self.classify_current(reading.aqi)?;
        let pollutant_risks = interpret_pollutant_risks(&reading.pollutants);

        Ok(CurrentConditions {
            city,
            aqi: reading.aqi,
            risk_category: category.level,
            risk_implications: category.implications,
            color: category.color,
            pollutant_risks,
            observed_at: reading.observed_at,
        })
    }

    /// The live AQI used for correction
    ///
    /// The outer error is a malformed value and fails the request; the inner
    /// error is the reason no value is available, which only degrades it.
    fn live_aqi(
        &self,
        city: &City,
        last_known: Option<f64>,
    ) -> Result<std::result::Result<f64, String>> {
        let live = match last_known {
            Some(aqi) => Some(aqi),
            None => match self.live.fetch_current_aqi(city) {
                Ok(reading) => reading.map(|r| r.aqi),
                Err(err) => {
                    tracing::warn!(city = %city, error = %err, "live AQI fetch failed");
                    return Ok(Err(err.to_string()));
                }
            },
        };

        match live {
            Some(aqi) if !aqi.is_finite() || aqi < 0.0 => {
                tracing::error!(city = %city, aqi, "live AQI is malformed");
                Err(ForecastError::InvalidAqiError(aqi))
            }
            Some(aqi) => Ok(Ok(aqi)),
            None => Ok(Err(format!("no live AQI reported for {city}"))),
        }
    }
}

impl std::fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forecaster")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}
