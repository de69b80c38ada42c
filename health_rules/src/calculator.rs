//! AQI calculation from raw pollutant concentrations
//!
//! Implements the CPCB NAQI sub-index method: each pollutant concentration is
//! linearly interpolated within its breakpoint band, and the overall AQI is
//! the maximum of the available sub-indices.

use crate::HealthError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Pollutants covered by the NAQI breakpoint tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    O3,
    Co,
    So2,
    Nh3,
}

/// A concentration band mapped onto an AQI band
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    concentration_low: f64,
    concentration_high: f64,
    aqi_low: f64,
    aqi_high: f64,
}

const fn bp(concentration_low: f64, concentration_high: f64, aqi_low: f64, aqi_high: f64) -> Breakpoint {
    Breakpoint {
        concentration_low,
        concentration_high,
        aqi_low,
        aqi_high,
    }
}

const OPEN: f64 = f64::INFINITY;

// Concentrations in µg/m³, except CO in mg/m³.
const PM10: [Breakpoint; 6] = [
    bp(0.0, 50.0, 0.0, 50.0),
    bp(51.0, 100.0, 51.0, 100.0),
    bp(101.0, 250.0, 101.0, 200.0),
    bp(251.0, 350.0, 201.0, 300.0),
    bp(351.0, 430.0, 301.0, 400.0),
    bp(431.0, OPEN, 401.0, 500.0),
];
const PM25: [Breakpoint; 6] = [
    bp(0.0, 30.0, 0.0, 50.0),
    bp(31.0, 60.0, 51.0, 100.0),
    bp(61.0, 90.0, 101.0, 200.0),
    bp(91.0, 120.0, 201.0, 300.0),
    bp(121.0, 250.0, 301.0, 400.0),
    bp(251.0, OPEN, 401.0, 500.0),
];
const NO2: [Breakpoint; 6] = [
    bp(0.0, 40.0, 0.0, 50.0),
    bp(41.0, 80.0, 51.0, 100.0),
    bp(81.0, 180.0, 101.0, 200.0),
    bp(181.0, 280.0, 201.0, 300.0),
    bp(281.0, 400.0, 301.0, 400.0),
    bp(401.0, OPEN, 401.0, 500.0),
];
const O3: [Breakpoint; 6] = [
    bp(0.0, 50.0, 0.0, 50.0),
    bp(51.0, 100.0, 51.0, 100.0),
    bp(101.0, 168.0, 101.0, 200.0),
    bp(169.0, 208.0, 201.0, 300.0),
    bp(209.0, 748.0, 301.0, 400.0),
    bp(749.0, OPEN, 401.0, 500.0),
];
const CO: [Breakpoint; 6] = [
    bp(0.0, 1.0, 0.0, 50.0),
    bp(1.1, 2.0, 51.0, 100.0),
    bp(2.1, 10.0, 101.0, 200.0),
    bp(10.1, 17.0, 201.0, 300.0),
    bp(17.1, 34.0, 301.0, 400.0),
    bp(34.1, OPEN, 401.0, 500.0),
];
const SO2: [Breakpoint; 6] = [
    bp(0.0, 40.0, 0.0, 50.0),
    bp(41.0, 80.0, 51.0, 100.0),
    bp(81.0, 380.0, 101.0, 200.0),
    bp(381.0, 800.0, 201.0, 300.0),
    bp(801.0, 1600.0, 301.0, 400.0),
    bp(1601.0, OPEN, 401.0, 500.0),
];
const NH3: [Breakpoint; 6] = [
    bp(0.0, 200.0, 0.0, 50.0),
    bp(201.0, 400.0, 51.0, 100.0),
    bp(401.0, 800.0, 101.0, 200.0),
    bp(801.0, 1200.0, 201.0, 300.0),
    bp(1201.0, 1800.0, 301.0, 400.0),
    bp(1801.0, OPEN, 401.0, 500.0),
];

impl Pollutant {
    /// All pollutants with breakpoint tables
    pub const ALL: [Pollutant; 7] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::Co,
        Pollutant::So2,
        Pollutant::Nh3,
    ];

    /// Short lowercase code, as used by AQICN's `iaqi` field
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::Co => "co",
            Pollutant::So2 => "so2",
            Pollutant::Nh3 => "nh3",
        }
    }

    fn breakpoints(&self) -> &'static [Breakpoint] {
        match self {
            Pollutant::Pm25 => &PM25,
            Pollutant::Pm10 => &PM10,
            Pollutant::No2 => &NO2,
            Pollutant::O3 => &O3,
            Pollutant::Co => &CO,
            Pollutant::So2 => &SO2,
            Pollutant::Nh3 => &NH3,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Pollutant {
    type Err = HealthError;

    /// Accepts codes such as `pm25`, `PM2.5`, `pm_10` or `NO2`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '.' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        Pollutant::ALL
            .iter()
            .copied()
            .find(|p| p.code() == normalized)
            .ok_or_else(|| HealthError::UnknownPollutant(s.to_string()))
    }
}

/// Calculate the AQI sub-index for a single pollutant concentration
///
/// Returns `None` for negative or non-finite concentrations. Concentrations
/// falling between two published bands are interpolated against the next band.
/// The open-ended top band has no upper breakpoint and reports its floor.
pub fn sub_index(pollutant: Pollutant, concentration: f64) -> Option<u32> {
    if !concentration.is_finite() || concentration < 0.0 {
        return None;
    }

    let band = pollutant
        .breakpoints()
        .iter()
        .find(|b| concentration <= b.concentration_high)?;

    if band.concentration_high.is_infinite() {
        return Some(band.aqi_low as u32);
    }

    let slope = (band.aqi_high - band.aqi_low) / (band.concentration_high - band.concentration_low);
    let value = slope * (concentration - band.concentration_low) + band.aqi_low;

    Some(value.round().max(0.0) as u32)
}

/// Calculate the overall AQI as the maximum sub-index of the given readings
///
/// Readings are `(pollutant name, concentration)` pairs; names that are not
/// recognised pollutants are skipped. Returns `None` when no sub-index can be
/// computed.
pub fn aqi_from_pollutants<'a, I, K>(readings: I) -> Option<u32>
where
    I: IntoIterator<Item = (K, &'a f64)>,
    K: AsRef<str>,
{
    readings
        .into_iter()
        .filter_map(|(name, &value)| match name.as_ref().parse::<Pollutant>() {
            Ok(pollutant) => sub_index(pollutant, value),
            Err(_) => {
                tracing::debug!(pollutant = name.as_ref(), "skipping unknown pollutant");
                None
            }
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_pollutant_names() {
        assert_eq!("pm25".parse::<Pollutant>().unwrap(), Pollutant::Pm25);
        assert_eq!("PM2.5".parse::<Pollutant>().unwrap(), Pollutant::Pm25);
        assert_eq!("PM10".parse::<Pollutant>().unwrap(), Pollutant::Pm10);
        assert_eq!("so2".parse::<Pollutant>().unwrap(), Pollutant::So2);
        assert!("benzene".parse::<Pollutant>().is_err());
    }

    #[test]
    fn test_sub_index_interpolation() {
        // Band edges map exactly onto AQI band edges
        assert_eq!(sub_index(Pollutant::Pm10, 0.0), Some(0));
        assert_eq!(sub_index(Pollutant::Pm10, 50.0), Some(50));
        assert_eq!(sub_index(Pollutant::Pm10, 100.0), Some(100));

        // PM2.5 of 45 µg/m³ falls in the 31-60 band: 51 + 14 * 49 / 29
        assert_eq!(sub_index(Pollutant::Pm25, 45.0), Some(75));

        // CO is measured in mg/m³
        assert_eq!(sub_index(Pollutant::Co, 1.0), Some(50));
    }

    #[test]
    fn test_sub_index_open_band_and_invalid_input() {
        assert_eq!(sub_index(Pollutant::Pm25, 900.0), Some(401));
        assert_eq!(sub_index(Pollutant::Pm25, -1.0), None);
        assert_eq!(sub_index(Pollutant::Pm25, f64::NAN), None);
    }

    #[test]
    fn test_aqi_is_max_sub_index() {
        let mut readings = BTreeMap::new();
        readings.insert("PM2.5".to_string(), 45.0);
        readings.insert("PM10".to_string(), 150.0);
        readings.insert("benzene".to_string(), 5.0);

        // PM10 at 150 gives 101 + (99 / 149) * 49 = 133.6
        assert_eq!(aqi_from_pollutants(&readings), Some(134));
    }

    #[test]
    fn test_aqi_without_known_pollutants() {
        let readings: BTreeMap<String, f64> = BTreeMap::new();
        assert_eq!(aqi_from_pollutants(&readings), None);

        let mut readings = BTreeMap::new();
        readings.insert("benzene".to_string(), 5.0);
        assert_eq!(aqi_from_pollutants(&readings), None);
    }
}
