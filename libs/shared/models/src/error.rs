use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const GENERIC_SERVER_ERROR: &str = "Error interno del servidor";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Server-side failures stay in the logs.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg) => msg,
            AppError::Internal(_) | AppError::Database(_) => GENERIC_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::warn!("Error: {}: {}", status, self);
        }

        let body = Json(json!({
            "error": self.client_message()
        }));

        (status, body).into_response()
    }
}
