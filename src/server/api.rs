//! API route definitions

use std::sync::Arc;
use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use super::{handlers, state::AppState, ServerConfig};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Not found. Visit / for the web UI or /health to check API status.",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "success": false,
            "error": "Method not allowed.",
        })),
    )
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::serve_index))
        .route("/predict", post(handlers::predict))
        .route("/train", post(handlers::train))
        .route("/analyze_dataset", get(handlers::analyze_dataset))
        .route("/health", get(handlers::health_check));

    // Static assets: directory on disk when configured, embedded copies otherwise
    match config.static_dir.as_deref() {
        Some(dir) if dir.is_dir() => {
            app = app.nest_service("/static", ServeDir::new(dir));
        }
        other => {
            if let Some(dir) = other {
                warn!(static_dir = %dir.display(), "Static directory not found, serving embedded assets");
            }
            app = app
                .route("/static/script.js", get(handlers::serve_script))
                .route("/static/style.css", get(handlers::serve_style));
        }
    }

    let app = app
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state);

    app.layer(CompressionLayer::new())
        .layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// CORS for one configured origin, or any origin when unset
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(|o| (o, o.parse::<HeaderValue>())) {
        Some((_, Ok(value))) => AllowOrigin::exact(value),
        Some((origin, Err(_))) => {
            warn!(origin = %origin, "Invalid CORS origin, allowing all origins");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
