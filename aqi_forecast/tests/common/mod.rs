#![allow(dead_code)]

use aqi_forecast::{
    City, ForecastConfig, ForecastError, LiveAqiClient, LiveAqiReading, ModelArtifact,
    ModelRegistry, ModelStore, ProphetModel, RegressorVector, Result, WeatherClient,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const CONFIG: &str = r#"
modeling:
  target_cities: [Delhi, Mumbai]
  prophet_model_version: v2
  forecast_days: 3
  residual_decay_factor: 0.85
  weather_regressors: [temperature, humidity, wind]
apis:
  aqicn: { api_timeout_seconds: 1, api_retries: 0, api_retry_delay_seconds: 0 }
  weather: { api_timeout_seconds: 1, api_retries: 0, api_retry_delay_seconds: 0 }
"#;

pub fn config() -> ForecastConfig {
    ForecastConfig::from_yaml_str(CONFIG).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Model predicting `m + k * days_since(history_end) + temperature`
pub fn model(city: &str, history_end: NaiveDate, k: f64, m: f64) -> ProphetModel {
    ProphetModel::linear(city, "v2", history_end, k, m)
        .with_regressor("temperature", 0.0, 1.0, 1.0)
        .with_regressor("humidity", 0.0, 1.0, 0.0)
        .with_regressor("wind", 0.0, 1.0, 0.0)
}

pub fn artifact(model: ProphetModel) -> String {
    ModelArtifact::Prophet(model).to_json().unwrap()
}

pub fn weather(temperature: f64) -> RegressorVector {
    RegressorVector::new()
        .with("temperature", temperature)
        .with("humidity", 60.0)
        .with("wind", 2.0)
}

/// In-memory artifacts keyed by city, counting every read
pub struct CountingStore {
    artifacts: Vec<(String, String)>,
    reads: AtomicUsize,
    delay: Duration,
}

impl CountingStore {
    pub fn new(artifacts: Vec<(&str, String)>) -> Self {
        Self {
            artifacts: artifacts
                .into_iter()
                .map(|(city, json)| (city.to_string(), json))
                .collect(),
            reads: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ModelStore for CountingStore {
    fn read_artifact(&self, city: &City, version: &str) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.artifacts
            .iter()
            .find(|(name, _)| name == city.as_str())
            .map(|(_, json)| json.clone().into_bytes())
            .ok_or_else(|| ForecastError::ModelNotFoundError {
                city: city.to_string(),
                version: version.to_string(),
            })
    }
}

pub fn registry(store: Arc<CountingStore>) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(store, config().regressors().clone()))
}

/// Weather source returning the same scripted days for every city
#[derive(Debug, Clone)]
pub struct ScriptedWeather {
    pub future: Vec<RegressorVector>,
    pub today: RegressorVector,
}

impl ScriptedWeather {
    pub fn new(today: f64, future: &[f64]) -> Self {
        Self {
            future: future.iter().map(|t| weather(*t)).collect(),
            today: weather(today),
        }
    }
}

impl WeatherClient for ScriptedWeather {
    fn fetch_forecast_regressors(
        &self,
        _city: &City,
        _start_date: NaiveDate,
        num_days: usize,
    ) -> Result<Vec<RegressorVector>> {
        Ok(self.future.iter().take(num_days).cloned().collect())
    }

    fn fetch_current_regressors(&self, _city: &City) -> Result<RegressorVector> {
        Ok(self.today.clone())
    }
}

/// Live AQI service that is always down
pub struct FailingLiveAqi;

impl LiveAqiClient for FailingLiveAqi {
    fn fetch_current_aqi(&self, _city: &City) -> Result<Option<LiveAqiReading>> {
        Err(ForecastError::ApiError {
            service: "AQICN".to_string(),
            message: "service unavailable".to_string(),
            status: Some(503),
        })
    }
}

/// Answers with a body the client cannot parse.
pub struct GarbledLiveAqi;

impl LiveAqiClient for GarbledLiveAqi {
    fn fetch_current_aqi(&self, _city: &City) -> Result<Option<LiveAqiReading>> {
        Err(ForecastError::ValidationError("unexpected response body".to_string()))
    }
}
