//! The CPCB AQI health-risk scale and AQI classification

use crate::{HealthError, Result};
use serde::Serialize;
use std::fmt;

/// General description of the Air Quality Index for educational display
pub const AQI_DEFINITION: &str = "The Air Quality Index (AQI) is a tool used by government agencies to \
communicate how polluted the air currently is or how polluted it is forecast to become. \
It helps you understand the potential health effects associated with different levels of air quality.";

/// Health-risk level of an AQI category, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Severe,
}

impl RiskLevel {
    /// Human-readable label, as shown on the CPCB scale
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Good => "Good",
            RiskLevel::Satisfactory => "Satisfactory",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Poor => "Poor",
            RiskLevel::VeryPoor => "Very Poor",
            RiskLevel::Severe => "Severe",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the health-risk scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskCategory {
    /// Risk level of this category
    pub level: RiskLevel,
    /// Lowest AQI value in this category (inclusive)
    pub lower_bound: f64,
    /// Highest AQI value in this category (inclusive), `None` when unbounded
    pub upper_bound: Option<f64>,
    /// Display colour as a hex string
    pub color: &'static str,
    /// Health implications of this category
    pub implications: &'static str,
}

impl RiskCategory {
    /// Label of the category's risk level
    pub fn label(&self) -> &'static str {
        self.level.label()
    }

    /// Whether the value lies within this category's inclusive range
    pub fn contains(&self, aqi: f64) -> bool {
        aqi >= self.lower_bound && self.upper_bound.map_or(true, |upper| aqi <= upper)
    }
}

/// CPCB National Air Quality Index categories
pub static CPCB_SCALE: [RiskCategory; 6] = [
    RiskCategory {
        level: RiskLevel::Good,
        lower_bound: 0.0,
        upper_bound: Some(50.0),
        color: "#228B22",
        implications: "Minimal Impact. Air quality is considered satisfactory, and air pollution poses little or no risk.",
    },
    RiskCategory {
        level: RiskLevel::Satisfactory,
        lower_bound: 51.0,
        upper_bound: Some(100.0),
        color: "#90EE90",
        implications: "Minor breathing discomfort to sensitive people. Air quality is acceptable.",
    },
    RiskCategory {
        level: RiskLevel::Moderate,
        lower_bound: 101.0,
        upper_bound: Some(200.0),
        color: "#FFD700",
        implications: "Breathing discomfort to people with lung disease such as asthma, and discomfort to people with heart disease, children and older adults.",
    },
    RiskCategory {
        level: RiskLevel::Poor,
        lower_bound: 201.0,
        upper_bound: Some(300.0),
        color: "#FFA500",
        implications: "Breathing discomfort to people on prolonged exposure, and discomfort to people with heart disease.",
    },
    RiskCategory {
        level: RiskLevel::VeryPoor,
        lower_bound: 301.0,
        upper_bound: Some(400.0),
        color: "#FF0000",
        implications: "Respiratory illness on prolonged exposure. Effect may be more pronounced in people with lung and heart diseases.",
    },
    RiskCategory {
        level: RiskLevel::Severe,
        lower_bound: 401.0,
        upper_bound: None,
        color: "#800000",
        implications: "Affects healthy people and seriously impacts those with existing diseases. May cause respiratory impact even on light physical activity.",
    },
];

/// Ordered health-risk scale used to classify AQI values
///
/// The scale is a static table: it is built once and shared by reference.
/// Categories are scanned in order and the first one whose upper bound is at
/// or above the value wins, so fractional values falling between two integer
/// ranges (e.g. 50.6) land in the higher category. The final category is
/// unbounded above.
#[derive(Debug, Clone, Copy)]
pub struct HealthRiskScale {
    categories: &'static [RiskCategory],
}

impl HealthRiskScale {
    /// The CPCB NAQI scale
    pub fn cpcb() -> Self {
        Self {
            categories: &CPCB_SCALE,
        }
    }

    /// Create a scale from a custom static table
    ///
    /// The table must be non-empty and start at zero. It must be sorted by
    /// lower bound, and only its last category may be unbounded above.
    pub fn new(categories: &'static [RiskCategory]) -> Result<Self> {
        let (Some(first), Some(last)) = (categories.first(), categories.last()) else {
            return Err(HealthError::InvalidInput(
                "Risk scale must contain at least one category".to_string(),
            ));
        };

        if first.lower_bound != 0.0 {
            return Err(HealthError::InvalidInput(format!(
                "First risk category must start at 0, found {}",
                first.lower_bound
            )));
        }

        if last.upper_bound.is_some() {
            return Err(HealthError::InvalidInput(
                "Last risk category must be unbounded above".to_string(),
            ));
        }

        for pair in categories.windows(2) {
            let upper = pair[0].upper_bound.ok_or_else(|| {
                HealthError::InvalidInput(format!(
                    "Only the last category may be unbounded, found '{}'",
                    pair[0].level
                ))
            })?;

            if pair[0].lower_bound > upper || upper >= pair[1].lower_bound {
                return Err(HealthError::InvalidInput(format!(
                    "Risk categories '{}' and '{}' are not in ascending order",
                    pair[0].level, pair[1].level
                )));
            }
        }

        Ok(Self { categories })
    }

    /// Categories in ascending order
    pub fn categories(&self) -> &'static [RiskCategory] {
        self.categories
    }

    /// Classify an AQI value into its risk category
    ///
    /// Negative and non-finite values are rejected: the classifier is also
    /// used directly on readings from external sources.
    pub fn classify(&self, aqi: f64) -> Result<&'static RiskCategory> {
        if !aqi.is_finite() || aqi < 0.0 {
            tracing::warn!(aqi, "invalid AQI value received for classification");
            return Err(HealthError::InvalidAqi(aqi));
        }

        let categories: &'static [RiskCategory] = self.categories;
        let category = categories
            .iter()
            .find(|category| category.upper_bound.map_or(true, |upper| aqi <= upper))
            .unwrap_or(&categories[categories.len() - 1]);

        Ok(category)
    }
}

impl Default for HealthRiskScale {
    fn default() -> Self {
        Self::cpcb()
    }
}
