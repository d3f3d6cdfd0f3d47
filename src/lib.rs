pub mod api;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod startup;
pub mod ui;

pub use db::DbPool;

use axum_extra::extract::cookie::Key;
use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::api::error::ApiError;
use crate::classifier::Detector;

/// Shared, read-only state handed to every request handler.
pub struct AppState {
    pub config: Config,
    /// `None` when the model artifacts could not be loaded at startup
    pub detector: Option<Detector>,
    /// Only present when serving the accounts variant
    pub db: Option<DbPool>,
    pub cookie_key: Key,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, detector: Option<Detector>) -> Self {
        let cookie_key = crypto::derive_cookie_key(&config.auth.secret_key);
        Self {
            config,
            detector,
            db: None,
            cookie_key,
            metrics_handle: None,
        }
    }

    /// Attach the accounts database
    pub fn with_db(mut self, db: DbPool) -> Self {
        self.db = Some(db);
        self
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn db(&self) -> Result<&DbPool, ApiError> {
        self.db
            .as_ref()
            .ok_or_else(|| ApiError::internal("Account storage is not configured"))
    }

    pub fn detector(&self) -> Result<&Detector, ApiError> {
        self.detector
            .as_ref()
            .ok_or_else(|| ApiError::model_unavailable("Model is not loaded"))
    }
}
