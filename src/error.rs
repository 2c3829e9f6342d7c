use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::tracker::TrackError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TrackError> for ApiError {
    fn from(err: TrackError) -> Self {
        match err {
            taken @ TrackError::DateTaken(_) => ApiError::Conflict(taken.to_string()),
            TrackError::Store(e) => ApiError::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(e) => {
                if let StoreError::Database(sqlx::Error::Database(db_err)) = e {
                    tracing::error!("❌ DB error: {}", db_err.message());
                    if let Some(code) = db_err.code() {
                        tracing::info!("ℹ️ SQLSTATE code: {}", code);
                    }
                    if let Some(constraint) = db_err.constraint() {
                        tracing::info!("🔒 Constraint violated: {}", constraint);
                    }
                } else {
                    tracing::error!("❌ Storage error: {}", e);
                }
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            ApiError::Store(_) => "storage error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
