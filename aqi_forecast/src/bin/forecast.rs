//! # aqi-forecast
//!
//! Command-line forecast for one city, printed as JSON.

use aqi_forecast::{
    CsvWeatherSource, FileModelStore, FixedLiveAqi, ForecastConfig, ForecastOptions, Forecaster,
    LiveAqiClient, ModelRegistry, NullLiveAqi,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aqi-forecast")]
#[command(about = "Multi-day AQI forecast with live residual correction", long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// City to forecast
    #[arg(long)]
    city: String,

    /// Daily weather regressors (CSV: date,city,<regressors...>)
    #[arg(short, long)]
    weather: PathBuf,

    /// Current live AQI used for residual correction
    #[arg(long)]
    live_aqi: Option<f64>,

    /// Number of days to forecast (defaults to the configured horizon)
    #[arg(short, long)]
    days: Option<usize>,

    /// Disable the live-AQI residual correction
    #[arg(long)]
    no_correction: bool,

    /// Date to forecast from, YYYY-MM-DD (defaults to the local date)
    #[arg(long)]
    today: Option<NaiveDate>,
}

fn run(cli: Cli) -> aqi_forecast::Result<String> {
    let config = ForecastConfig::from_path(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let weather = Arc::new(CsvWeatherSource::from_path(&cli.weather)?.with_as_of(today));
    let live: Arc<dyn LiveAqiClient> = match cli.live_aqi {
        Some(aqi) => Arc::new(FixedLiveAqi::new(aqi)),
        None => Arc::new(NullLiveAqi),
    };

    let store = Arc::new(FileModelStore::new(config.models_dir()));
    let registry = Arc::new(ModelRegistry::new(store, config.regressors().clone()));
    let forecaster = Forecaster::new(config, registry, weather, live).with_today(today);

    let options = ForecastOptions {
        days: cli.days,
        apply_residual_correction: !cli.no_correction,
        last_known_aqi: None,
    };
    let report = forecaster.forecast(&cli.city, &options)?;

    serde_json::to_string_pretty(&report)
        .map_err(|e| aqi_forecast::ForecastError::ValidationError(format!("cannot render report: {e}")))
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if err.is_forecast_unavailable() {
                eprintln!("Forecast unavailable for this city.");
            }
            ExitCode::FAILURE
        }
    }
}
