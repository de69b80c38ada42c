//! # Breathe Easy
//!
//! Short-horizon air quality forecasting with health-risk guidance.
//!
//! The workspace is split into two crates re-exported here:
//!
//! - [`health_rules`]: the CPCB AQI scale, pollutant sub-indices and
//!   pollutant health warnings
//! - [`aqi_forecast`]: model loading, live residual correction and the
//!   end-to-end forecast pipeline
//!
//! ## Example
//!
//! ```
//! use breathe_easy_workspace::health_rules::{HealthRiskScale, RiskLevel};
//!
//! let scale = HealthRiskScale::cpcb();
//! assert_eq!(scale.classify(101.0).unwrap().level, RiskLevel::Moderate);
//! ```

pub use aqi_forecast;
pub use health_rules;

pub use aqi_forecast::{ForecastConfig, ForecastPoint, ForecastReport, Forecaster};
pub use health_rules::{HealthRiskScale, RiskCategory, RiskLevel};
