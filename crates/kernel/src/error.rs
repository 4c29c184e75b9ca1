//! Application error types.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Application errors.
///
/// Form outcomes never use this type; it covers infrastructure failures such
/// as an unreachable session store or a broken template.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
        };

        if let AppError::Internal(e) = &self {
            tracing::error!(error = %format!("{e:#}"), "internal server error");
        }

        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>Error</title></head>\n<body><h1>{self}</h1></body></html>"
        );

        (status, Html(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
