//! Model registry: lazy loading and caching of trained models
//!
//! The registry is an explicitly constructed object shared by handle. Cached
//! models are read without blocking other readers; the first load of a key is
//! serialized so its artifact is read from the store at most once, however
//! many requests ask for it concurrently.

use crate::config::{City, RegressorSet};
use crate::error::{ForecastError, Result};
use crate::models::{self, TrainedModel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Storage of serialized model artifacts
pub trait ModelStore: Send + Sync {
    /// Raw artifact bytes for (city, version)
    ///
    /// Fails with [`ForecastError::ModelNotFoundError`] when no artifact exists.
    fn read_artifact(&self, city: &City, version: &str) -> Result<Vec<u8>>;
}

/// Model artifacts stored as JSON files in one directory
///
/// Files are named `<City>_prophet_model_<version>.json`.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for (city, version)
    pub fn artifact_path(&self, city: &City, version: &str) -> PathBuf {
        self.dir
            .join(format!("{}_prophet_model_{version}.json", city.as_str()))
    }
}

impl ModelStore for FileModelStore {
    fn read_artifact(&self, city: &City, version: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(city, version);
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "model artifact read");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ForecastError::ModelNotFoundError {
                    city: city.to_string(),
                    version: version.to_string(),
                })
            }
            Err(e) => Err(ForecastError::ModelLoadError(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}

type ModelKey = (City, String);

/// Process-wide cache of trained models keyed by (city, version)
pub struct ModelRegistry {
    store: Arc<dyn ModelStore>,
    regressors: RegressorSet,
    models: RwLock<HashMap<ModelKey, Arc<dyn TrainedModel>>>,
    loading: Mutex<HashMap<ModelKey, Arc<Mutex<()>>>>,
}

impl ModelRegistry {
    /// Create an empty registry validating models against `regressors`
    pub fn new(store: Arc<dyn ModelStore>, regressors: RegressorSet) -> Self {
        Self {
            store,
            regressors,
            models: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
        }
    }

    /// The model for (city, version), loading it on first access
    ///
    /// Concurrent first requests for the same key wait for a single load and
    /// all receive the same instance. Failed loads are not cached.
    pub fn get_model(&self, city: &City, version: &str) -> Result<Arc<dyn TrainedModel>> {
        let key: ModelKey = (city.clone(), version.to_string());

        if let Some(model) = self.cached(&key) {
            tracing::debug!(city = %city, version, "model cache hit");
            return Ok(model);
        }

        let gate = {
            let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(loading.entry(key.clone()).or_default())
        };
        let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);

        // Another request may have finished the load while we waited.
        if let Some(model) = self.cached(&key) {
            tracing::debug!(city = %city, version, "model loaded by concurrent request");
            return Ok(model);
        }

        let result = self.load(city, version);

        let model = match result {
            Ok(model) => {
                let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
                // First writer wins.
                Arc::clone(models.entry(key.clone()).or_insert(model))
            }
            Err(err) => {
                tracing::error!(city = %city, version, error = %err, "model load failed");
                self.release(&key);
                return Err(err);
            }
        };

        self.release(&key);
        Ok(model)
    }

    fn load(&self, city: &City, version: &str) -> Result<Arc<dyn TrainedModel>> {
        tracing::info!(city = %city, version, "loading model");
        let bytes = self.store.read_artifact(city, version)?;
        let model = models::load_model(&bytes, city, version, &self.regressors)?;
        tracing::info!(
            city = %city,
            version,
            model = model.name(),
            history_end = %model.history_end(),
            "model loaded"
        );
        Ok(model)
    }

    fn cached(&self, key: &ModelKey) -> Option<Arc<dyn TrainedModel>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn release(&self, key: &ModelKey) {
        self.loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Drop the cached model for (city, version); the next request reloads it
    pub fn invalidate(&self, city: &City, version: &str) -> bool {
        let key: ModelKey = (city.clone(), version.to_string());
        let removed = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some();
        if removed {
            tracing::info!(city = %city, version, "model invalidated");
        }
        removed
    }

    /// Drop every cached model
    pub fn clear(&self) {
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("model cache cleared");
    }

    /// Whether (city, version) is cached
    pub fn is_cached(&self, city: &City, version: &str) -> bool {
        self.cached(&(city.clone(), version.to_string())).is_some()
    }

    /// Number of cached models
    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Regressor set models are validated against
    pub fn regressors(&self) -> &RegressorSet {
        &self.regressors
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("regressors", &self.regressors)
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}
