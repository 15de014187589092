use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::HubError;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Hub unavailable")]
    HubUnavailable(#[from] HubError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::HubUnavailable(e) => {
                tracing::error!("hub call failed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Matchmaking is unavailable".to_string(),
                    "SERVICE_UNAVAILABLE",
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
