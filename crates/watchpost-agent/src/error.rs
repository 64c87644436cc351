use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use watchpost_core::IntegrationError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    GatewayTimeout(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(m) | Self::GatewayTimeout(m) | Self::Internal(m) => write!(f, "{m}"),
        }
    }
}

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::UnknownIntegration(_) => Self::NotFound(err.to_string()),
            IntegrationError::Timeout { .. } => Self::GatewayTimeout(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            Self::GatewayTimeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
