//! Churn Predictor Server Module
//!
//! Web server for the churn predictor. Serves the single-page UI and the
//! JSON API it talks to: prediction, retraining and batch analysis.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::dataset::ChurnDataset;
use crate::predictor::{ChurnPredictor, PredictorConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Labelled CSV used by `/train` and `/analyze_dataset`
    pub data_path: PathBuf,
    /// Where the trained model is saved and loaded
    pub model_path: PathBuf,
    /// Serve the UI from this directory instead of the embedded copy
    pub static_dir: Option<PathBuf>,
    /// Rows returned by `/analyze_dataset`
    pub analyze_limit: usize,
    /// Single allowed CORS origin; `None` allows any origin
    pub cors_origin: Option<String>,
    pub predictor: PredictorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            data_path: std::env::var("DATA_PATH")
                .unwrap_or_else(|_| "customer_churn_data.csv".to_string())
                .into(),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "churn_model.json".to_string())
                .into(),
            static_dir: std::env::var("STATIC_DIR").ok().filter(|d| !d.is_empty()).map(PathBuf::from),
            analyze_limit: std::env::var("ANALYZE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            cors_origin: std::env::var("CORS_ORIGIN")
                .ok()
                .filter(|o| !o.is_empty() && o != "*"),
            predictor: PredictorConfig::default(),
        }
    }
}

/// Load the saved model, or train one from the dataset if none is saved.
///
/// Never fails: problems are logged and the predictor starts untrained.
pub fn prepare_predictor(config: &ServerConfig) -> ChurnPredictor {
    let mut predictor = ChurnPredictor::new(config.predictor.clone());

    match predictor.load(&config.model_path) {
        Ok(true) => return predictor,
        Ok(false) => info!(path = %config.model_path.display(), "No saved model found"),
        Err(e) => warn!(path = %config.model_path.display(), error = %e, "Saved model unreadable"),
    }

    if !config.data_path.exists() {
        warn!(
            data_path = %config.data_path.display(),
            "Dataset not found, starting untrained. Provide the dataset and POST /train."
        );
        return predictor;
    }

    info!(data_path = %config.data_path.display(), "Training initial model");
    let trained = ChurnDataset::from_csv(&config.data_path)
        .and_then(|dataset| predictor.train(&dataset))
        .and_then(|_| predictor.save(&config.model_path));

    if let Err(e) = trained {
        warn!(error = %e, "Initial training failed, starting untrained");
    }
    predictor
}

async fn shutdown_signal(started_at: chrono::DateTime<chrono::Utc>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install CTRL+C handler, running until killed");
        std::future::pending::<()>().await;
    }
    let stop_time = chrono::Utc::now();
    info!(
        stopped_at = %stop_time.to_rfc3339(),
        uptime_secs = stop_time.signed_duration_since(started_at).num_seconds(),
        "Shutdown signal received, stopping server gracefully"
    );
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        data_path = %config.data_path.display(),
        model_path = %config.model_path.display(),
        "Preparing churn model"
    );

    let startup_config = config.clone();
    let predictor = tokio::task::spawn_blocking(move || prepare_predictor(&startup_config)).await?;
    let model_loaded = predictor.is_trained();

    let state = Arc::new(AppState::with_predictor(config.clone(), predictor));
    let started_at = state.started_at;
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        model_loaded,
        static_dir = %config.static_dir.as_deref().map_or("embedded".into(), Path::to_string_lossy),
        pid = std::process::id(),
        "Churn predictor listening"
    );
    info!(url = %format!("http://{}", addr), "Web UI available");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(started_at))
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic;

    fn scratch_config(dir: &Path) -> ServerConfig {
        ServerConfig {
            data_path: dir.join("customers.csv"),
            model_path: dir.join("churn_model.json"),
            static_dir: None,
            predictor: PredictorConfig {
                n_estimators: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.predictor.n_estimators, 100);
        assert_eq!(config.predictor.max_depth, Some(10));
        assert!(config.analyze_limit > 0);
    }

    #[test]
    fn test_prepare_without_data_starts_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = prepare_predictor(&scratch_config(dir.path()));
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_prepare_trains_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path());
        synthetic::write_csv(&mut synthetic::generate(120, 42).unwrap(), &config.data_path).unwrap();

        let predictor = prepare_predictor(&config);
        assert!(predictor.is_trained());
        assert!(config.model_path.exists());

        // Second start loads the saved artifact
        std::fs::remove_file(&config.data_path).unwrap();
        assert!(prepare_predictor(&config).is_trained());
    }
}
