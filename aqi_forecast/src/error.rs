//! Error types for the aqi_forecast crate

use health_rules::HealthError;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the aqi_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Invalid or missing configuration, including unknown cities
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No model artifact exists for the requested city and version
    #[error("Model not found for {city} (version {version})")]
    ModelNotFoundError { city: String, version: String },

    /// A model artifact exists but could not be loaded
    #[error("Model load error: {0}")]
    ModelLoadError(String),

    /// A required weather regressor is missing for a requested day
    #[error("Regressor unavailable: {0}")]
    RegressorUnavailableError(String),

    /// External API failure after the configured retries
    #[error("{service} API error: {message}{}", status_suffix(.status))]
    ApiError {
        service: String,
        message: String,
        status: Option<u16>,
    },

    /// External API call exceeded its configured timeout
    #[error("{service} API request timed out after {timeout:?}")]
    ApiTimeoutError { service: String, timeout: Duration },

    /// Malformed AQI value reached the classifier
    #[error("Invalid AQI value: {0}")]
    InvalidAqiError(f64),

    /// Error related to parameter or data validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Construct an API error without an HTTP status
    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        ForecastError::ApiError {
            service: service.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Whether the error means no forecast can be shown for the city
    ///
    /// Model, regressor and API failures fall in this class; configuration
    /// and data-validation errors do not.
    pub fn is_forecast_unavailable(&self) -> bool {
        matches!(
            self,
            ForecastError::ModelNotFoundError { .. }
                | ForecastError::ModelLoadError(_)
                | ForecastError::RegressorUnavailableError(_)
                | ForecastError::ApiError { .. }
                | ForecastError::ApiTimeoutError { .. }
        )
    }

    /// Whether the error is a configuration problem
    pub fn is_config(&self) -> bool {
        matches!(self, ForecastError::ConfigError(_))
    }

    /// Whether a failed API call is worth retrying
    ///
    /// Authorization failures and unknown resources will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForecastError::ApiError { status, .. } => !matches!(status, Some(401) | Some(403) | Some(404)),
            ForecastError::ApiTimeoutError { .. } | ForecastError::IoError(_) => true,
            _ => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status: {s})")).unwrap_or_default()
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<HealthError> for ForecastError {
    fn from(err: HealthError) -> Self {
        match err {
            HealthError::InvalidAqi(value) => ForecastError::InvalidAqiError(value),
            other => ForecastError::ValidationError(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for ForecastError {
    fn from(err: serde_yaml::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::ValidationError(format!("CSV error: {err}"))
    }
}
