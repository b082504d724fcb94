use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use persistence::LeaderboardError;
use serde_json::json;
use thiserror::Error;
use types::errors::{FeedError, SessionError};

/// Central error type for the HTTP endpoints
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionClosed => AppError::ServiceUnavailable(err.to_string()),
            SessionError::Feed(FeedError::NotFound { .. }) => AppError::NotFound(err.to_string()),
            SessionError::Feed(FeedError::Io(_)) => AppError::InternalError(err.into()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<LeaderboardError> for AppError {
    fn from(err: LeaderboardError) -> Self {
        AppError::InternalError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            AppError::InternalError(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}
