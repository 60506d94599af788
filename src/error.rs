//! Application error type.
//!
//! Handlers return `AppError`, which maps each failure class to its HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{auth::pages, db::StoreError};

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid credential (401)
    #[error("Not authenticated")]
    Unauthenticated,

    /// OAuth callback state did not match the one issued at login (400)
    #[error("Mismatching state")]
    StateMismatch,

    /// The identity provider rejected the exchange. Rendered as an error page.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Absent, or owned by someone else (404)
    #[error("Watchlist entry not found")]
    NotFound,

    /// Bad input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::StateMismatch => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Provider(msg) => return pages::provider_error(msg).into_response(),
            AppError::Database(e) => {
                error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
