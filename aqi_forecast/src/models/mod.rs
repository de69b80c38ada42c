//! Trained forecasting models
//!
//! A trained model exposes a single capability: a point prediction of AQI for
//! a date given that day's weather regressors. Serialized models are JSON
//! artifacts tagged by `kind`; each kind is one forecasting technique.

use crate::config::{City, RegressorSet};
use crate::error::{ForecastError, Result};
use crate::regressors::RegressorVector;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

pub mod prophet;

pub use prophet::ProphetModel;

/// A trained per-city model, immutable once loaded
pub trait TrainedModel: Debug + Send + Sync {
    /// Point prediction of AQI for `date`
    ///
    /// Regressors are looked up by name; the vector must carry exactly the
    /// model's regressor names.
    fn predict(&self, date: NaiveDate, regressors: &RegressorVector) -> Result<f64>;

    /// Regressor names the model was trained with
    fn regressor_names(&self) -> &[String];

    /// Last date covered by the training data
    fn history_end(&self) -> NaiveDate;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Serialized model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Decomposable trend + seasonality + regressor model
    Prophet(ProphetModel),
}

impl ModelArtifact {
    /// Parse an artifact from JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ForecastError::ModelLoadError(format!("malformed model artifact: {e}")))
    }

    /// Serialize the artifact to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ForecastError::ValidationError(format!("cannot serialize model: {e}")))
    }

    /// Validate the artifact for the given key and regressor set, producing a
    /// ready-to-use model
    pub fn into_model(
        self,
        city: &City,
        version: &str,
        regressors: &RegressorSet,
    ) -> Result<Arc<dyn TrainedModel>> {
        match self {
            ModelArtifact::Prophet(model) => {
                Ok(Arc::new(model.validated(city, version, regressors)?))
            }
        }
    }
}

/// Parse and validate a serialized model in one step
pub fn load_model(
    bytes: &[u8],
    city: &City,
    version: &str,
    regressors: &RegressorSet,
) -> Result<Arc<dyn TrainedModel>> {
    ModelArtifact::from_json(bytes)?.into_model(city, version, regressors)
}
