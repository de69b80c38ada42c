//! # AQI Forecast
//!
//! Multi-day Air Quality Index forecasting for a fixed set of cities.
//!
//! ## Features
//!
//! - Per-city trained models loaded lazily from JSON artifacts and cached
//! - Weather regressors validated against the configured regressor set
//! - Live-AQI residual correction with geometric per-day decay
//! - CPCB health-risk classification of every forecast day
//! - Per-endpoint timeout and retry policy for external services
//!
//! ## Quick Start
//!
//! ```no_run
//! use aqi_forecast::{
//!     CsvWeatherSource, FileModelStore, ForecastConfig, Forecaster, ModelRegistry, NullLiveAqi,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> aqi_forecast::Result<()> {
//!     let config = ForecastConfig::from_path("config.yaml")?;
//!     let store = Arc::new(FileModelStore::new(config.models_dir()));
//!     let registry = Arc::new(ModelRegistry::new(store, config.regressors().clone()));
//!     let weather = Arc::new(CsvWeatherSource::from_path("weather.csv")?);
//!
//!     let forecaster = Forecaster::new(config, registry, weather, Arc::new(NullLiveAqi));
//!     for point in forecaster.get_forecast("Delhi")? {
//!         println!("{}: {} ({})", point.date, point.predicted_aqi, point.risk_category);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod config;
pub mod corrector;
pub mod data;
pub mod error;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod regressors;
pub mod retry;
pub mod sources;

// Re-export commonly used types
pub use crate::assembler::ForecastPoint;
pub use crate::config::{City, DecayFactor, EndpointConfig, ForecastConfig, RegressorSet};
pub use crate::corrector::{CorrectedPoint, ResidualState};
pub use crate::data::CsvWeatherSource;
pub use crate::error::{ForecastError, Result};
pub use crate::generator::{BaselineForecast, BaselinePoint};
pub use crate::models::{ModelArtifact, ProphetModel, TrainedModel};
pub use crate::pipeline::{Correction, CurrentConditions, ForecastOptions, ForecastReport, Forecaster};
pub use crate::registry::{FileModelStore, ModelRegistry, ModelStore};
pub use crate::regressors::{RegressorProvider, RegressorVector};
pub use crate::retry::RetryPolicy;
pub use crate::sources::{FixedLiveAqi, LiveAqiClient, LiveAqiReading, NullLiveAqi, WeatherClient};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
