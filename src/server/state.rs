//! Application state management

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::predictor::{ChurnModel, ChurnPredictor};

use super::error::Result;
use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub predictor: RwLock<ChurnPredictor>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State with an untrained predictor
    pub fn new(config: ServerConfig) -> Self {
        let predictor = ChurnPredictor::new(config.predictor.clone());
        Self::with_predictor(config, predictor)
    }

    pub fn with_predictor(config: ServerConfig, predictor: ChurnPredictor) -> Self {
        Self {
            config,
            predictor: RwLock::new(predictor),
            started_at: Utc::now(),
        }
    }

    pub async fn model_loaded(&self) -> bool {
        self.predictor.read().await.is_trained()
    }

    /// Load the saved model from disk if none is in memory.
    ///
    /// Fails with `ModelNotTrained` when there is nothing to load.
    pub async fn ensure_model_loaded(&self) -> Result<()> {
        if self.model_loaded().await {
            return Ok(());
        }

        let path = self.config.model_path.clone();
        if !path.exists() {
            return Err(crate::ChurnError::ModelNotFitted.into());
        }

        let model = tokio::task::spawn_blocking(move || ChurnModel::load(path)).await??;

        let mut predictor = self.predictor.write().await;
        // Another request may have trained or loaded while we were reading
        if !predictor.is_trained() {
            predictor.set_model(model);
            info!(path = %self.config.model_path.display(), "Loaded churn model on demand");
        }
        Ok(())
    }

    /// Swap in a freshly trained model
    pub async fn install_model(&self, model: ChurnModel) {
        self.predictor.write().await.set_model(model);
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}

