//! # Health Rules
//!
//! Air quality rules following the Indian CPCB National Air Quality Index.
//! This crate provides the health-risk scale used to classify AQI values,
//! the pollutant breakpoint tables used to compute an AQI from raw
//! concentrations, and the per-pollutant health thresholds used to produce
//! human-readable warnings.

use thiserror::Error;

pub mod calculator;
pub mod interpreter;
pub mod scale;

pub use calculator::{aqi_from_pollutants, sub_index, Pollutant};
pub use interpreter::{interpret_pollutant_risks, PollutantRisk};
pub use scale::{HealthRiskScale, RiskCategory, RiskLevel, AQI_DEFINITION, CPCB_SCALE};

/// Errors that can occur while applying air quality rules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HealthError {
    #[error("Invalid AQI value: {0}")]
    InvalidAqi(f64),

    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for health rule operations
pub type Result<T> = std::result::Result<T, HealthError>;
