//! CSV-backed weather source
//!
//! Reads a daily feature file with a `date` column (YYYY-MM-DD), a `city`
//! column and one numeric column per regressor:
//!
//! ```text
//! date,city,temperature,humidity,wind
//! 2024-11-01,Delhi,24.1,61,2.3
//! ```
//!
//! A blank cell means the regressor is not available for that day.

use crate::config::City;
use crate::error::{ForecastError, Result};
use crate::regressors::RegressorVector;
use crate::sources::WeatherClient;
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const DATE_COLUMN: &str = "date";
const CITY_COLUMN: &str = "city";

/// Weather regressors loaded from a CSV file
#[derive(Debug, Clone, Default)]
pub struct CsvWeatherSource {
    rows: BTreeMap<(String, NaiveDate), RegressorVector>,
    as_of: Option<NaiveDate>,
}

impl CsvWeatherSource {
    /// Load a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let source = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), rows = source.len(), "weather data loaded");
        Ok(source)
    }

    /// Parse CSV data from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ForecastError::ValidationError(format!("CSV has no '{name}' column")))
        };
        let date_idx = position(DATE_COLUMN)?;
        let city_idx = position(CITY_COLUMN)?;

        let regressor_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx && *i != city_idx)
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        let mut rows = BTreeMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let line = line + 2;

            let raw_date = record.get(date_idx).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
                ForecastError::ValidationError(format!("line {line}: invalid date '{raw_date}': {e}"))
            })?;
            let city = record.get(city_idx).unwrap_or_default().trim().to_lowercase();

            let mut vector = RegressorVector::new();
            for (idx, name) in &regressor_columns {
                let cell = record.get(*idx).unwrap_or_default().trim();
                if cell.is_empty() {
                    continue;
                }
                let value: f64 = cell.parse().map_err(|_| {
                    ForecastError::ValidationError(format!(
                        "line {line}: '{name}' is not a number: '{cell}'"
                    ))
                })?;
                vector.insert(name.clone(), value);
            }

            if rows.insert((city, date), vector).is_some() {
                return Err(ForecastError::ValidationError(format!(
                    "line {line}: duplicate row for {} on {date}",
                    record.get(city_idx).unwrap_or_default().trim()
                )));
            }
        }

        Ok(Self { rows, as_of: None })
    }

    /// Date whose row is reported as the current day's weather
    ///
    /// Defaults to the local date.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Number of (city, date) rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row(&self, city: &City, date: NaiveDate) -> Result<RegressorVector> {
        self.rows
            .get(&(city.as_str().to_lowercase(), date))
            .cloned()
            .ok_or_else(|| {
                ForecastError::RegressorUnavailableError(format!("no weather data for {city} on {date}"))
            })
    }
}

impl WeatherClient for CsvWeatherSource {
    fn fetch_forecast_regressors(
        &self,
        city: &City,
        start_date: NaiveDate,
        num_days: usize,
    ) -> Result<Vec<RegressorVector>> {
        (0..num_days)
            .map(|offset| self.row(city, start_date + Duration::days(offset as i64)))
            .collect()
    }

    fn fetch_current_regressors(&self, city: &City) -> Result<RegressorVector> {
        let today = self.as_of.unwrap_or_else(|| Local::now().date_naive());
        self.row(city, today)
    }
}
