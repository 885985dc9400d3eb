//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::dataset::ChurnDataset;
use crate::features::CustomerFeatures;
use crate::predictor::ChurnPredictor;

use super::error::{Result, ServerError};
use super::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const SCRIPT_JS: &str = include_str!("../../static/script.js");
const STYLE_CSS: &str = include_str!("../../static/style.css");

fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
    }))
}

// ============================================================================
// Churn Handlers
// ============================================================================

/// Score one customer
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CustomerFeatures>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(customer) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    state.ensure_model_loaded().await?;
    let assessment = state.predictor.read().await.predict(&customer)?;

    info!(
        churn_probability = assessment.churn_probability,
        risk_category = %assessment.risk_category,
        "Prediction served"
    );
    Ok(success(assessment))
}

/// Retrain on the configured dataset, persist the model and swap it in
pub async fn train(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let data_path = state.config.data_path.clone();
    let model_path = state.config.model_path.clone();
    let trainer = ChurnPredictor::new(state.predictor.read().await.config().clone());

    info!(data_path = %data_path.display(), "Training requested");

    let model = tokio::task::spawn_blocking(move || -> crate::Result<_> {
        let dataset = ChurnDataset::from_csv(&data_path)?;
        let model = trainer.fit_model(&dataset)?;
        model.save(&model_path)?;
        Ok(model)
    })
    .await??;

    let summary = model.summary().clone();
    state.install_model(model).await;

    info!(
        model_path = %state.config.model_path.display(),
        test_accuracy = summary.test_accuracy,
        "Model trained and saved"
    );
    Ok(success(summary))
}

/// Score the first customers of the configured dataset
pub async fn analyze_dataset(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    state.ensure_model_loaded().await?;

    let data_path = state.config.data_path.clone();
    let limit = state.config.analyze_limit;
    let dataset = tokio::task::spawn_blocking(move || {
        ChurnDataset::from_csv(&data_path).map(|dataset| dataset.head(limit))
    })
    .await??;

    let rows = state.predictor.read().await.analyze(&dataset, limit)?;
    info!(rows = rows.len(), "Dataset analyzed");
    Ok(success(rows))
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model_loaded().await,
        "uptime_secs": state.uptime_secs(),
    }))
}

// ============================================================================
// UI Handlers
// ============================================================================

/// The page, from `STATIC_DIR` when configured, otherwise the embedded copy
pub async fn serve_index(State(state): State<Arc<AppState>>) -> Html<String> {
    if let Some(dir) = &state.config.static_dir {
        if let Ok(html) = tokio::fs::read_to_string(dir.join("index.html")).await {
            return Html(html);
        }
    }
    Html(INDEX_HTML.to_string())
}

pub async fn serve_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], SCRIPT_JS)
}

pub async fn serve_style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}
