mod common;

use approx::assert_relative_eq;
use aqi_forecast::{
    Correction, FixedLiveAqi, ForecastError, ForecastOptions, Forecaster, LiveAqiReading,
    NullLiveAqi,
};
use chrono::Utc;
use common::{
    artifact, date, model, registry, CountingStore, FailingLiveAqi, GarbledLiveAqi,
    ScriptedWeather,
};
use health_rules::RiskLevel;
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Baseline today 120, baseline forecast [130, 125, 128]
fn forecaster(live: Arc<dyn aqi_forecast::LiveAqiClient>) -> Forecaster {
    let store = Arc::new(CountingStore::new(vec![(
        "Delhi",
        artifact(model("Delhi", date(2024, 10, 31), 0.0, 120.0)),
    )]));
    let weather = Arc::new(ScriptedWeather::new(0.0, &[10.0, 5.0, 8.0]));

    Forecaster::new(common::config(), registry(store), weather, live).with_today(date(2024, 11, 1))
}

#[test]
fn test_live_residual_is_applied_with_decay() {
    let report = forecaster(Arc::new(FixedLiveAqi::new(150.0)))
        .forecast("Delhi", &ForecastOptions::default())
        .unwrap();

    assert_eq!(report.correction, Correction::Applied { residual: 30.0 });
    assert_eq!(report.live_aqi, Some(150.0));
    assert_eq!(report.generated_on, date(2024, 11, 1));

    let dates: Vec<_> = report.points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![date(2024, 11, 2), date(2024, 11, 3), date(2024, 11, 4)]);

    let baseline: Vec<_> = report.points.iter().map(|p| p.baseline_aqi).collect();
    assert_eq!(baseline, vec![130.0, 125.0, 128.0]);

    assert_relative_eq!(report.points[0].corrected_aqi, 155.5, epsilon = 1e-9);
    assert_relative_eq!(report.points[1].corrected_aqi, 146.675, epsilon = 1e-9);
    assert_relative_eq!(report.points[2].corrected_aqi, 146.42375, epsilon = 1e-9);

    assert_eq!(report.points[1].predicted_aqi, 147);
    assert_eq!(report.points[2].predicted_aqi, 146);
    assert!(report.points.iter().all(|p| p.corrected));
    assert!(report
        .points
        .iter()
        .all(|p| p.risk_category == RiskLevel::Moderate));
}

#[test]
fn test_caller_supplied_live_aqi_bypasses_client() {
    let options = ForecastOptions {
        last_known_aqi: Some(150.0),
        ..ForecastOptions::default()
    };
    let report = forecaster(Arc::new(FailingLiveAqi)).forecast("delhi, India", &options).unwrap();

    assert_eq!(report.city.as_str(), "Delhi");
    assert_eq!(report.correction, Correction::Applied { residual: 30.0 });
}

#[test]
fn test_missing_live_aqi_degrades_to_baseline() {
    let report = forecaster(Arc::new(NullLiveAqi))
        .forecast("Delhi", &ForecastOptions::default())
        .unwrap();

    assert!(matches!(report.correction, Correction::Unavailable { .. }));
    assert_eq!(report.live_aqi, None);
    for point in &report.points {
        assert!(!point.corrected);
        assert_eq!(point.corrected_aqi, point.baseline_aqi);
    }
}

#[test]
fn test_live_api_failure_degrades_to_baseline() {
    let report = forecaster(Arc::new(FailingLiveAqi))
        .forecast("Delhi", &ForecastOptions::default())
        .unwrap();

    match report.correction {
        Correction::Unavailable { reason } => assert!(reason.contains("service unavailable")),
        other => panic!("expected uncorrected forecast, got {other:?}"),
    }
    assert!(report.points.iter().all(|p| !p.corrected));
}

#[test]
fn test_unparseable_live_response_degrades_to_baseline() {
    let report = forecaster(Arc::new(GarbledLiveAqi))
        .forecast("Delhi", &ForecastOptions::default())
        .unwrap();

    match &report.correction {
        Correction::Unavailable { reason } => assert!(reason.contains("unexpected response body")),
        other => panic!("expected uncorrected forecast, got {other:?}"),
    }
    assert_eq!(report.live_aqi, None);
    for point in &report.points {
        assert!(!point.corrected);
        assert_eq!(point.corrected_aqi, point.baseline_aqi);
    }
}

#[test]
fn test_correction_can_be_disabled() {
    let options = ForecastOptions {
        apply_residual_correction: false,
        ..ForecastOptions::default()
    };
    let report = forecaster(Arc::new(FixedLiveAqi::new(400.0)))
        .forecast("Delhi", &options)
        .unwrap();

    assert_eq!(report.correction, Correction::Disabled);
    assert_eq!(report.points[0].corrected_aqi, 130.0);
}

#[test]
fn test_horizon_override() {
    let options = ForecastOptions {
        days: Some(2),
        ..ForecastOptions::default()
    };
    let report = forecaster(Arc::new(NullLiveAqi)).forecast("Delhi", &options).unwrap();
    assert_eq!(report.points.len(), 2);
}

#[test]
fn test_malformed_live_aqi_is_surfaced() {
    let result = forecaster(Arc::new(FixedLiveAqi::new(-5.0))).get_forecast("Delhi");
    assert!(matches!(result, Err(ForecastError::InvalidAqiError(v)) if v == -5.0));
}

#[test]
fn test_missing_future_regressor_fails_forecast() {
    let store = Arc::new(CountingStore::new(vec![(
        "Delhi",
        artifact(model("Delhi", date(2024, 10, 31), 0.0, 120.0)),
    )]));
    let mut weather = ScriptedWeather::new(0.0, &[10.0, 5.0, 8.0]);
    weather.future[1] = aqi_forecast::RegressorVector::new()
        .with("temperature", 20.0)
        .with("humidity", 55.0);

    let forecaster = Forecaster::new(
        common::config(),
        registry(store.clone()),
        Arc::new(weather),
        Arc::new(FixedLiveAqi::new(150.0)),
    )
    .with_today(date(2024, 11, 1));

    match forecaster.get_forecast("Delhi") {
        Err(err @ ForecastError::RegressorUnavailableError(_)) => {
            assert!(err.to_string().contains("wind"));
            assert!(err.is_forecast_unavailable());
        }
        other => panic!("expected RegressorUnavailableError, got {other:?}"),
    }
    // Generation never started, so the model was never loaded.
    assert_eq!(store.reads(), 0);
}

#[test]
fn test_unknown_city_is_a_config_error() {
    let err = forecaster(Arc::new(NullLiveAqi)).get_forecast("Paris").unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_missing_model_is_forecast_unavailable() {
    let err = forecaster(Arc::new(NullLiveAqi)).get_forecast("Mumbai").unwrap_err();
    assert!(matches!(err, ForecastError::ModelNotFoundError { ref city, .. } if city == "Mumbai"));
    assert!(err.is_forecast_unavailable());
}

#[test]
fn test_history_end_after_today_is_the_reference_day() {
    // The model's estimate for its last training day is 100; for the real
    // today it would be 96.
    let store = Arc::new(CountingStore::new(vec![(
        "Delhi",
        artifact(model("Delhi", date(2024, 11, 5), 1.0, 100.0)),
    )]));
    let forecaster = Forecaster::new(
        common::config(),
        registry(store),
        Arc::new(ScriptedWeather::new(0.0, &[0.0, 0.0, 0.0])),
        Arc::new(FixedLiveAqi::new(100.0)),
    )
    .with_today(date(2024, 11, 1));

    let report = forecaster.forecast("Delhi", &ForecastOptions::default()).unwrap();
    assert_eq!(report.correction, Correction::Applied { residual: 0.0 });
    assert_eq!(report.points[0].corrected_aqi, report.points[0].baseline_aqi);
}

#[test]
fn test_model_is_loaded_once_across_requests() {
    let store = Arc::new(CountingStore::new(vec![(
        "Delhi",
        artifact(model("Delhi", date(2024, 10, 31), 0.0, 120.0)),
    )]));
    let forecaster = Forecaster::new(
        common::config(),
        registry(store.clone()),
        Arc::new(ScriptedWeather::new(0.0, &[10.0, 5.0, 8.0])),
        Arc::new(NullLiveAqi),
    )
    .with_today(date(2024, 11, 1));

    for _ in 0..3 {
        forecaster.get_forecast("Delhi").unwrap();
    }
    assert_eq!(store.reads(), 1);
}

#[test]
fn test_current_conditions() {
    let reading = LiveAqiReading::new(180.0, Utc::now())
        .with_pollutant("pm25", 95.0)
        .with_pollutant("o3", 20.0);
    let forecaster = forecaster(Arc::new(FixedLiveAqi { reading }));

    let current = forecaster.current_conditions("Delhi").unwrap();
    assert_eq!(current.aqi, 180.0);
    assert_eq!(current.risk_category, RiskLevel::Moderate);
    assert_eq!(current.pollutant_risks.len(), 1);
    assert!(current.pollutant_risks[0].to_string().starts_with("PM25"));
}

#[test]
fn test_current_conditions_without_reading_is_an_api_error() {
    let err = forecaster(Arc::new(NullLiveAqi)).current_conditions("Delhi").unwrap_err();
    assert!(matches!(err, ForecastError::ApiError { .. }));
}

#[test]
fn test_classify_current_rejects_negative_values() {
    let forecaster = forecaster(Arc::new(NullLiveAqi));

    assert_eq!(forecaster.classify_current(401.0).unwrap().level, RiskLevel::Severe);
    assert!(matches!(
        forecaster.classify_current(-1.0),
        Err(ForecastError::InvalidAqiError(_))
    ));
}

#[test]
fn test_report_serializes_as_json() {
    let report = forecaster(Arc::new(FixedLiveAqi::new(150.0)))
        .forecast("Delhi", &ForecastOptions::default())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["city"], "Delhi");
    assert_eq!(json["correction"]["status"], "applied");
    assert_eq!(json["points"][0]["risk_category"], "Moderate");
    assert_eq!(json["points"][0]["date"], "2024-11-02");
}
