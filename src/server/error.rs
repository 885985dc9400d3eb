//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ChurnError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    ModelNotTrained(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChurnError> for ServerError {
    fn from(err: ChurnError) -> Self {
        match err {
            ChurnError::ModelNotFitted => ServerError::ModelNotTrained(err.to_string()),
            ChurnError::InvalidInput(_) => ServerError::BadRequest(err.to_string()),
            ChurnError::DatasetNotFound(_)
            | ChurnError::DataError(_)
            | ChurnError::FeatureNotFound(_)
            | ChurnError::ShapeError { .. }
            | ChurnError::ValidationError(_) => ServerError::Unprocessable(err.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("Background task failed: {}", err))
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelNotTrained(_) => StatusCode::CONFLICT,
            ServerError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal server error");
                "An internal error occurred. Check server logs for details.".to_string()
            }
            ServerError::Unprocessable(detail) => {
                tracing::warn!(detail = %detail, "Dataset rejected");
                detail.clone()
            }
            ServerError::BadRequest(msg) | ServerError::ModelNotTrained(msg) => msg.clone(),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
