//! Interfaces to the external live-AQI and weather services
//!
//! The forecasting core consumes these collaborators through traits. HTTP
//! implementations live outside this crate; [`crate::retry`] wraps any
//! implementation with per-endpoint timeout and retry behaviour.

use crate::config::City;
use crate::error::Result;
use crate::regressors::RegressorVector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A live AQI observation for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveAqiReading {
    /// Reported AQI
    pub aqi: f64,
    /// Individual pollutant readings keyed by pollutant code (e.g. `pm25`)
    #[serde(default)]
    pub pollutants: BTreeMap<String, f64>,
    /// Time at which the station observed the reading
    pub observed_at: DateTime<Utc>,
}

impl LiveAqiReading {
    pub fn new(aqi: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            aqi,
            pollutants: BTreeMap::new(),
            observed_at,
        }
    }

    /// Builder-style pollutant reading
    pub fn with_pollutant(mut self, code: impl Into<String>, value: f64) -> Self {
        self.pollutants.insert(code.into(), value);
        self
    }
}

/// A source of live AQI observations
pub trait LiveAqiClient: Send + Sync {
    /// Current AQI for a city
    ///
    /// `Ok(None)` means the service answered but has no value for the city
    /// (unknown station, or the station is not reporting).
    fn fetch_current_aqi(&self, city: &City) -> Result<Option<LiveAqiReading>>;
}

/// A source of weather regressors
pub trait WeatherClient: Send + Sync {
    /// Forecast regressors for `num_days` consecutive days from `start_date`
    fn fetch_forecast_regressors(
        &self,
        city: &City,
        start_date: NaiveDate,
        num_days: usize,
    ) -> Result<Vec<RegressorVector>>;

    /// Regressors for the current day
    fn fetch_current_regressors(&self, city: &City) -> Result<RegressorVector>;
}

/// The nullary live AQI source: never has a value
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLiveAqi;

impl LiveAqiClient for NullLiveAqi {
    fn fetch_current_aqi(&self, _city: &City) -> Result<Option<LiveAqiReading>> {
        Ok(None)
    }
}

/// Fixed live AQI source: reports the same reading for every city
#[derive(Debug, Clone)]
pub struct FixedLiveAqi {
    pub reading: LiveAqiReading,
}

impl FixedLiveAqi {
    /// A reading with the given AQI observed now
    pub fn new(aqi: f64) -> Self {
        Self {
            reading: LiveAqiReading::new(aqi, Utc::now()),
        }
    }
}

impl LiveAqiClient for FixedLiveAqi {
    fn fetch_current_aqi(&self, _city: &City) -> Result<Option<LiveAqiReading>> {
        Ok(Some(self.reading.clone()))
    }
}
