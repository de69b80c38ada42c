//! Weather regressors and the regressor provider adapter

use crate::config::{City, RegressorSet};
use crate::error::{ForecastError, Result};
use crate::sources::WeatherClient;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Regressor values for one calendar day, keyed by regressor name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegressorVector(BTreeMap<String, f64>);

impl RegressorVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Insert a value, returning the previous one for that name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Regressor names present in this vector, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + Clone {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that the key set equals the configured regressor set exactly
    pub fn validate(&self, regressors: &RegressorSet) -> Result<()> {
        let missing = regressors.missing_from(self.names());
        let unexpected = regressors.unexpected_in(self.names());

        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }

        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing [{}]", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            problems.push(format!("unexpected [{}]", unexpected.join(", ")));
        }

        Err(ForecastError::RegressorUnavailableError(problems.join("; ")))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RegressorVector {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Supplies validated regressor vectors from the weather collaborator
///
/// Every vector handed out has exactly the configured regressor names. A
/// missing regressor is never substituted with a default: the request fails
/// with [`ForecastError::RegressorUnavailableError`] instead.
#[derive(Clone)]
pub struct RegressorProvider {
    client: Arc<dyn WeatherClient>,
    regressors: RegressorSet,
}

impl RegressorProvider {
    pub fn new(client: Arc<dyn WeatherClient>, regressors: RegressorSet) -> Self {
        Self { client, regressors }
    }

    pub fn regressors(&self) -> &RegressorSet {
        &self.regressors
    }

    /// Regressors for `num_days` consecutive days starting at `start_date`
    pub fn get_future_regressors(
        &self,
        city: &City,
        start_date: NaiveDate,
        num_days: usize,
    ) -> Result<Vec<RegressorVector>> {
        let vectors = self
            .client
            .fetch_forecast_regressors(city, start_date, num_days)?;

        if vectors.len() != num_days {
            return Err(ForecastError::RegressorUnavailableError(format!(
                "weather source returned {} days of regressors for {city}, expected {num_days}",
                vectors.len()
            )));
        }

        for (offset, vector) in vectors.iter().enumerate() {
            let date = start_date + Duration::days(offset as i64);
            vector.validate(&self.regressors).map_err(|e| match e {
                ForecastError::RegressorUnavailableError(msg) => {
                    ForecastError::RegressorUnavailableError(format!("{city} on {date}: {msg}"))
                }
                other => other,
            })?;
        }

        tracing::debug!(city = %city, %start_date, num_days, "future regressors validated");
        Ok(vectors)
    }

    /// Regressors observed for the current day
    pub fn get_today_regressors(&self, city: &City) -> Result<RegressorVector> {
        let vector = self.client.fetch_current_regressors(city)?;
        vector.validate(&self.regressors).map_err(|e| match e {
            ForecastError::RegressorUnavailableError(msg) => {
                ForecastError::RegressorUnavailableError(format!("{city} today: {msg}"))
            }
            other => other,
        })?;
        Ok(vector)
    }
}

impl std::fmt::Debug for RegressorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegressorProvider")
            .field("regressors", &self.regressors)
            .finish_non_exhaustive()
    }
}
