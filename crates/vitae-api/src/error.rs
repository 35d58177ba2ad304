use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Endpoint an error came from; selects the public failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RecordView,
    ViewHistory,
}

impl Operation {
    const fn failure_message(self) -> &'static str {
        match self {
            Self::RecordView => "Failed to record view",
            Self::ViewHistory => "Failed to load views",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RecordView => "record_view",
            Self::ViewHistory => "view_history",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Link not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Storage error during {}: {detail}", .operation.label())]
    Storage {
        operation: Operation,
        detail: String,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn from_core(operation: Operation, error: vitae_core::Error) -> Self {
        match error {
            vitae_core::Error::LinkNotFound(link_id) => Self::NotFound(link_id),
            vitae_core::Error::InvalidInput(message) => Self::BadRequest(message),
            error @ (vitae_core::Error::Database(_)
            | vitae_core::Error::LibSql(_)
            | vitae_core::Error::Serialization(_)) => Self::Storage {
                operation,
                detail: error.to_string(),
            },
        }
    }

    /// Public body text; never includes internal detail.
    const fn public_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Link not found",
            Self::BadRequest(_) => "Invalid view payload",
            Self::Storage { operation, .. } => operation.failure_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(link_id) => {
                tracing::debug!(link_id = %link_id, "Link not found");
                StatusCode::NOT_FOUND
            }
            Self::BadRequest(message) => {
                tracing::warn!(reason = %message, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            Self::Storage { operation, detail } => {
                tracing::error!(operation = operation.label(), error = %detail, "Storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
