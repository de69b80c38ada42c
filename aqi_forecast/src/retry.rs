//! Per-endpoint timeout and retry policy for external API calls

use crate::config::{City, EndpointConfig};
use crate::error::{ForecastError, Result};
use crate::regressors::RegressorVector;
use crate::sources::{LiveAqiClient, LiveAqiReading, WeatherClient};
use chrono::NaiveDate;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;

/// Timeout and fixed-delay retry behaviour for one external service
///
/// Each attempt runs on its own worker thread and is abandoned once the
/// configured timeout elapses. Failed attempts are retried up to
/// `retries` more times, sleeping `retry_delay` in between, unless the error
/// is not retryable (see [`ForecastError::is_retryable`]).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    service: String,
    config: EndpointConfig,
}

impl RetryPolicy {
    pub fn new(service: impl Into<String>, config: EndpointConfig) -> Self {
        Self {
            service: service.into(),
            config,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> EndpointConfig {
        self.config
    }

    /// Run `op` under this policy
    pub fn call<T, F>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let op = Arc::new(op);
        let attempts = self.config.retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.attempt(Arc::clone(&op)) {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(service = %self.service, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        service = %self.service,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "request failed, retrying in {:?}",
                        self.config.retry_delay
                    );
                    thread::sleep(self.config.retry_delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(service = %self.service, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }

    fn attempt<T, F>(&self, op: Arc<F>) -> Result<T>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("{}-request", self.service.to_lowercase()))
            .spawn(move || {
                // The receiver is gone if the attempt already timed out.
                let _ = tx.send(op());
            })?;

        match rx.recv_timeout(self.config.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ForecastError::ApiTimeoutError {
                service: self.service.clone(),
                timeout: self.config.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(ForecastError::api(
                self.service.clone(),
                "request worker stopped without a response",
            )),
        }
    }
}

/// Live AQI client decorated with a retry policy
#[derive(Clone)]
pub struct RetryingLiveAqi {
    inner: Arc<dyn LiveAqiClient>,
    policy: RetryPolicy,
}

impl RetryingLiveAqi {
    pub fn new(inner: Arc<dyn LiveAqiClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl LiveAqiClient for RetryingLiveAqi {
    fn fetch_current_aqi(&self, city: &City) -> Result<Option<LiveAqiReading>> {
        let inner = Arc::clone(&self.inner);
        let city = city.clone();
        self.policy.call(move || inner.fetch_current_aqi(&city))
    }
}

/// Weather client decorated with a retry policy
#[derive(Clone)]
pub struct RetryingWeather {
    inner: Arc<dyn WeatherClient>,
    policy: RetryPolicy,
}

impl RetryingWeather {
    pub fn new(inner: Arc<dyn WeatherClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl WeatherClient for RetryingWeather {
    fn fetch_forecast_regressors(
        &self,
        city: &City,
        start_date: NaiveDate,
        num_days: usize,
    ) -> Result<Vec<RegressorVector>> {
        let inner = Arc::clone(&self.inner);
        let city = city.clone();
        self.policy
            .call(move || inner.fetch_forecast_regressors(&city, start_date, num_days))
    }

    fn fetch_current_regressors(&self, city: &City) -> Result<RegressorVector> {
        let inner = Arc::clone(&self.inner);
        let city = city.clone();
        self.policy.call(move || inner.fetch_current_regressors(&city))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn policy(retries: u32, timeout_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            "Test",
            EndpointConfig {
                timeout: Duration::from_millis(timeout_ms),
                retries,
                retry_delay: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = policy(3, 1_000).call(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ForecastError::api("Test", "service unavailable"))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhausted_retries_surface_api_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = policy(2, 1_000).call(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ForecastError::api("Test", "service unavailable"))
        });

        assert!(matches!(result, Err(ForecastError::ApiError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unauthorized_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = policy(5, 1_000).call(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ForecastError::ApiError {
                service: "Test".to_string(),
                message: "invalid key".to_string(),
                status: Some(401),
            })
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slow_request_times_out() {
        let result = policy(0, 20).call(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(1)
        });

        match result {
            Err(ForecastError::ApiTimeoutError { service, timeout }) => {
                assert_eq!(service, "Test");
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
