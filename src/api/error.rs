use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::search::{RecommendError, SearchError};

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Errors a handler can return. Write endpoints only produce `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Search engine unreachable or answering with an error.
    #[error("{0}")]
    Backend(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }
        let body = ErrorBody {
            error: code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {e}"))
    }
}

impl From<RecommendError> for ApiError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::NotFound(id) => Self::NotFound(format!("product '{id}' not found")),
            RecommendError::Search(SearchError::NotFound(what)) => {
                Self::NotFound(format!("{what} not found"))
            }
            RecommendError::Search(other) => Self::Backend(other.to_string()),
            RecommendError::Embedding(e) => Self::Internal(format!("embedding failed: {e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommend_errors_map_to_statuses() {
        let not_found: ApiError = RecommendError::NotFound("42".into()).into();
        assert_eq!(not_found.status().0, StatusCode::NOT_FOUND);

        let backend: ApiError = RecommendError::Search(SearchError::Status {
            status: 503,
            body: "unavailable".into(),
        })
        .into();
        assert_eq!(backend.status().0, StatusCode::BAD_GATEWAY);

        let embed: ApiError = RecommendError::Embedding(anyhow::anyhow!("model crashed")).into();
        assert_eq!(embed.status().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
