use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::generator::GenerateError;
use crate::history::HistoryError;

/// Errors surfaced to HTTP callers as `{"detail": "..."}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::MissingCredential => AppError::Unauthorized(err.to_string()),
            GenerateError::BadRequest(_) | GenerateError::InvalidImage(_) => {
                AppError::BadRequest(err.to_string())
            }
            GenerateError::Upstream(_) | GenerateError::Recipe(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NotFound(_) => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, detail),
            AppError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            AppError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };

        if status.is_server_error() {
            error!("Request failed with {}: {}", status, detail);
        } else {
            warn!("Request rejected with {}: {}", status, detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type Result<T, E = AppError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parse_recipe;

    #[test]
    fn generation_errors_map_to_statuses() {
        let unauthorized: AppError = GenerateError::MissingCredential.into();
        assert_eq!(unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);

        let malformed = parse_recipe("not json").unwrap_err();
        let internal: AppError = GenerateError::Recipe(malformed).into();
        assert!(internal.to_string().contains("Failed to parse AI response as JSON"));
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn history_errors_map_to_statuses() {
        let not_found: AppError = HistoryError::NotFound("Date directory".to_string()).into();
        assert_eq!(not_found.to_string(), "Date directory not found");
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let read: AppError = HistoryError::Read("bad".to_string()).into();
        assert_eq!(read.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
