//! Application configuration
//!
//! The configuration file is YAML with `modeling`, `paths`, `apis` and
//! `logging` sections. It is parsed into raw serde structs and validated once
//! into an immutable [`ForecastConfig`]; every invalid value is reported as a
//! [`ForecastError::ConfigError`] before any forecast is attempted.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CITIES: [&str; 5] = ["Delhi", "Mumbai", "Bangalore", "Chennai", "Hyderabad"];
const DEFAULT_REGRESSORS: [&str; 3] = ["temperature", "humidity", "wind"];
const DEFAULT_MODEL_VERSION: &str = "v2";
const DEFAULT_FORECAST_DAYS: usize = 5;
const DEFAULT_DECAY_FACTOR: f64 = 0.85;
const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECONDS: f64 = 2.0;

/// A city from the configured set of forecast targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct City(String);

impl City {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        City(name.into())
    }

    /// The city name as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-day attenuation of the residual correction, in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecayFactor(f64);

impl DecayFactor {
    /// Validate a decay factor
    pub fn new(value: f64) -> Result<Self> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "residual_decay_factor must be in (0, 1], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// The raw factor
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Weight applied to the residual on the given forecast day (1-based)
    pub fn weight(&self, day: u32) -> f64 {
        self.0.powi(day as i32)
    }
}

/// Ordered, non-empty set of weather regressor names a model was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegressorSet(Vec<String>);

impl RegressorSet {
    /// Validate a regressor list: non-empty, no blank or duplicate names
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.into().trim().to_string()).collect();

        if names.is_empty() {
            return Err(ForecastError::ConfigError(
                "weather_regressors must not be empty".to_string(),
            ));
        }
        if names.iter().any(|n| n.is_empty()) {
            return Err(ForecastError::ConfigError(
                "weather_regressors must not contain blank names".to_string(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ForecastError::ConfigError(format!(
                    "weather_regressors contains '{name}' more than once"
                )));
            }
        }

        Ok(Self(names))
    }

    /// Regressor names in configured order
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// Configured names absent from `names`
    pub fn missing_from<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.0
            .iter()
            .filter(|n| !names.clone().into_iter().any(|other| other == n.as_str()))
            .cloned()
            .collect()
    }

    /// Names in `names` that are not configured
    pub fn unexpected_in<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|n| !self.contains(n))
            .map(str::to_string)
            .collect()
    }
}

/// Timeout and retry settings for one external API endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointConfig {
    /// Maximum duration of a single attempt
    pub timeout: Duration,
    /// Number of retries after the first failed attempt
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECONDS),
        }
    }
}

/// Validated, immutable application configuration
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    cities: Vec<City>,
    model_version: String,
    forecast_days: usize,
    decay_factor: DecayFactor,
    regressors: RegressorSet,
    models_dir: PathBuf,
    aqicn: EndpointConfig,
    weather: EndpointConfig,
    log_level: String,
}

impl ForecastConfig {
    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        raw.validate()
    }

    /// Load and validate a YAML configuration file
    ///
    /// A relative `paths.models_dir` is resolved against the directory
    /// containing the configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_yaml_str(&contents)?;

        if config.models_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.models_dir = parent.join(&config.models_dir);
            }
        }

        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Resolve user input to a configured city
    ///
    /// Matching is case-insensitive and ignores a trailing country qualifier,
    /// so "delhi, India" resolves to "Delhi".
    pub fn city(&self, name: &str) -> Result<City> {
        let query = name.split(',').next().unwrap_or_default().trim();

        self.cities
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(query))
            .cloned()
            .ok_or_else(|| {
                ForecastError::ConfigError(format!(
                    "unknown city '{name}'; configured cities are: {}",
                    self.cities
                        .iter()
                        .map(City::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn forecast_days(&self) -> usize {
        self.forecast_days
    }

    pub fn decay_factor(&self) -> DecayFactor {
        self.decay_factor
    }

    pub fn regressors(&self) -> &RegressorSet {
        &self.regressors
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Retry settings of the live AQI endpoint
    pub fn aqicn(&self) -> EndpointConfig {
        self.aqicn
    }

    /// Retry settings of the weather forecast endpoint
    pub fn weather(&self) -> EndpointConfig {
        self.weather
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Replace the decay factor
    pub fn with_decay_factor(mut self, value: f64) -> Result<Self> {
        self.decay_factor = DecayFactor::new(value)?;
        Ok(self)
    }

    /// Replace the regressor set
    pub fn with_regressors<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regressors = RegressorSet::new(names)?;
        Ok(self)
    }

    /// Replace the forecast horizon
    pub fn with_forecast_days(mut self, days: usize) -> Result<Self> {
        if days == 0 {
            return Err(ForecastError::ConfigError(
                "forecast_days must be at least 1".to_string(),
            ));
        }
        self.forecast_days = days;
        Ok(self)
    }

    /// Replace the model directory
    pub fn with_models_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.models_dir = dir.into();
        self
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| City::new(*c)).collect(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            forecast_days: DEFAULT_FORECAST_DAYS,
            decay_factor: DecayFactor(DEFAULT_DECAY_FACTOR),
            regressors: RegressorSet(DEFAULT_REGRESSORS.iter().map(|r| r.to_string()).collect()),
            models_dir: PathBuf::from("models"),
            aqicn: EndpointConfig::default(),
            weather: EndpointConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    modeling: RawModeling,
    paths: RawPaths,
    apis: RawApis,
    logging: RawLogging,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawModeling {
    target_cities: Vec<String>,
    prophet_model_version: String,
    forecast_days: usize,
    residual_decay_factor: f64,
    weather_regressors: Vec<String>,
}

impl Default for RawModeling {
    fn default() -> Self {
        Self {
            target_cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            prophet_model_version: DEFAULT_MODEL_VERSION.to_string(),
            forecast_days: DEFAULT_FORECAST_DAYS,
            residual_decay_factor: DEFAULT_DECAY_FACTOR,
            weather_regressors: DEFAULT_REGRESSORS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPaths {
    models_dir: PathBuf,
}

impl Default for RawPaths {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawApis {
    aqicn: RawEndpoint,
    weather: RawEndpoint,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawEndpoint {
    api_timeout_seconds: f64,
    api_retries: u32,
    api_retry_delay_seconds: f64,
}

impl Default for RawEndpoint {
    fn default() -> Self {
        Self {
            api_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            api_retries: DEFAULT_RETRIES,
            api_retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: String,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RawEndpoint {
    fn validate(&self, name: &str) -> Result<EndpointConfig> {
        if !(self.api_timeout_seconds.is_finite() && self.api_timeout_seconds > 0.0) {
            return Err(ForecastError::ConfigError(format!(
                "apis.{name}.api_timeout_seconds must be positive, got {}",
                self.api_timeout_seconds
            )));
        }
        if !(self.api_retry_delay_seconds.is_finite() && self.api_retry_delay_seconds >= 0.0) {
            return Err(ForecastError::ConfigError(format!(
                "apis.{name}.api_retry_delay_seconds must not be negative, got {}",
                self.api_retry_delay_seconds
            )));
        }

        let timeout = Duration::try_from_secs_f64(self.api_timeout_seconds).map_err(|e| {
            ForecastError::ConfigError(format!(
                "apis.{name}.api_timeout_seconds is out of range ({}): {e}",
                self.api_timeout_seconds
            ))
        })?;
        let retry_delay = Duration::try_from_secs_f64(self.api_retry_delay_seconds).map_err(|e| {
            ForecastError::ConfigError(format!(
                "apis.{name}.api_retry_delay_seconds is out of range ({}): {e}",
                self.api_retry_delay_seconds
            ))
        })?;

        Ok(EndpointConfig {
            timeout,
            retries: self.api_retries,
            retry_delay,
        })
    }
}

impl RawConfig {
    fn validate(self) -> Result<ForecastConfig> {
        let modeling = self.modeling;

        let mut cities: Vec<City> = Vec::new();
        for name in modeling.target_cities {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ForecastError::ConfigError(
                    "target_cities must not contain blank names".to_string(),
                ));
            }
            if !cities.iter().any(|c| c.as_str().eq_ignore_ascii_case(&name)) {
                cities.push(City(name));
            }
        }
        if cities.is_empty() {
            return Err(ForecastError::ConfigError(
                "target_cities must not be empty".to_string(),
            ));
        }

        let model_version = modeling.prophet_model_version.trim().to_string();
        if model_version.is_empty() {
            return Err(ForecastError::ConfigError(
                "prophet_model_version must not be empty".to_string(),
            ));
        }

        if modeling.forecast_days == 0 {
            return Err(ForecastError::ConfigError(
                "forecast_days must be at least 1".to_string(),
            ));
        }

        Ok(ForecastConfig {
            cities,
            model_version,
            forecast_days: modeling.forecast_days,
            decay_factor: DecayFactor::new(modeling.residual_decay_factor)?,
            regressors: RegressorSet::new(modeling.weather_regressors)?,
            models_dir: self.paths.models_dir,
            aqicn: self.apis.aqicn.validate("aqicn")?,
            weather: self.apis.weather.validate("weather")?,
            log_level: self.logging.level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
modeling:
  target_cities: [Delhi, Mumbai]
  prophet_model_version: v3
  forecast_days: 3
  residual_decay_factor: 0.9
  weather_regressors: [temperature, humidity, wind]
paths:
  models_dir: /var/lib/models
apis:
  aqicn:
    api_timeout_seconds: 5
    api_retries: 1
    api_retry_delay_seconds: 0.5
logging:
  level: debug
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ForecastConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.cities().len(), 2);
        assert_eq!(config.model_version(), "v3");
        assert_eq!(config.forecast_days(), 3);
        assert_eq!(config.decay_factor().value(), 0.9);
        assert_eq!(config.regressors().names(), ["temperature", "humidity", "wind"]);
        assert_eq!(config.models_dir(), Path::new("/var/lib/models"));
        assert_eq!(config.aqicn().timeout, Duration::from_secs(5));
        assert_eq!(config.aqicn().retries, 1);
        assert_eq!(config.aqicn().retry_delay, Duration::from_millis(500));
        // Endpoints are configured independently
        assert_eq!(config.weather(), EndpointConfig::default());
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = ForecastConfig::from_yaml_str("logging:\n  level: warn\n").unwrap();

        assert_eq!(config.cities().len(), 5);
        assert_eq!(config.model_version(), "v2");
        assert_eq!(config.forecast_days(), 5);
        assert_eq!(config.decay_factor().value(), 0.85);
    }

    #[test]
    fn test_decay_factor_bounds() {
        assert!(DecayFactor::new(1.0).is_ok());
        assert!(DecayFactor::new(0.01).is_ok());
        assert!(DecayFactor::new(0.0).is_err());
        assert!(DecayFactor::new(1.01).is_err());
        assert!(DecayFactor::new(-0.5).is_err());
        assert!(DecayFactor::new(f64::NAN).is_err());
    }

    #[test]
    fn test_decay_weight() {
        let decay = DecayFactor::new(0.5).unwrap();
        assert_eq!(decay.weight(1), 0.5);
        assert_eq!(decay.weight(3), 0.125);
    }

    #[test]
    fn test_regressor_set_validation() {
        assert!(RegressorSet::new(Vec::<String>::new()).is_err());
        assert!(RegressorSet::new(["temperature", "temperature"]).is_err());
        assert!(RegressorSet::new(["temperature", " "]).is_err());

        let set = RegressorSet::new(["temperature", "humidity"]).unwrap();
        assert_eq!(set.missing_from(["temperature"]), vec!["humidity".to_string()]);
        assert_eq!(set.unexpected_in(["temperature", "ozone"]), vec!["ozone".to_string()]);
    }

    #[test]
    fn test_city_lookup() {
        let config = ForecastConfig::default();

        assert_eq!(config.city("Delhi").unwrap().as_str(), "Delhi");
        assert_eq!(config.city("mumbai").unwrap().as_str(), "Mumbai");
        assert_eq!(config.city("Chennai, India").unwrap().as_str(), "Chennai");

        let err = config.city("Atlantis").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let cases = [
            "modeling:\n  residual_decay_factor: 0\n",
            "modeling:\n  residual_decay_factor: 1.5\n",
            "modeling:\n  weather_regressors: []\n",
            "modeling:\n  target_cities: []\n",
            "modeling:\n  forecast_days: 0\n",
            "apis:\n  weather:\n    api_timeout_seconds: 0\n",
            "apis:\n  aqicn:\n    api_timeout_seconds: 1.0e30\n",
            "apis:\n  weather:\n    api_retry_delay_seconds: 1.0e25\n",
            "modeling: [not, a, mapping]\n",
        ];

        for yaml in cases {
            let err = ForecastConfig::from_yaml_str(yaml).unwrap_err();
            assert!(err.is_config(), "expected config error for {yaml:?}, got {err}");
        }
    }
}
