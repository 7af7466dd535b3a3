//! Broadcaster error types with HTTP status code mapping.
//!
//! [`BroadcasterError`] is the central error type for request-facing
//! failures. Each variant maps to a specific HTTP status code and a
//! structured JSON error response. [`ChannelError`] describes a failed
//! write to a single stream and never reaches an HTTP client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::MessageId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "missing required parameter: userId",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                    |
/// |-----------|-----------------|--------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                |
/// | 2000–2999 | State/Not Found | 403 Forbidden / 404 Not Found  |
/// | 3000–3999 | Server          | 500 Internal Server Error      |
#[derive(Debug, thiserror::Error)]
pub enum BroadcasterError {
    /// A stream or query was opened without a recipient identity.
    #[error("missing required parameter: userId")]
    MissingRecipient,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No notification with the given ID exists in the store.
    #[error("notification not found: {0}")]
    NotificationNotFound(MessageId),

    /// The caller is not the addressee of the notification.
    #[error("notification {0} is not addressed to this user")]
    Forbidden(MessageId),

    /// Route does not exist.
    #[error("endpoint not found")]
    EndpointNotFound,

    /// Durable store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BroadcasterError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MissingRecipient => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::NotificationNotFound(_) => 2001,
            Self::Forbidden(_) => 2002,
            Self::EndpointNotFound => 2004,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRecipient | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotificationNotFound(_) | Self::EndpointNotFound => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for BroadcasterError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for BroadcasterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure to write a frame to a single channel.
///
/// Either variant means the channel is presumed dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The owning session is closing or closed, or its stream was dropped.
    #[error("channel closed")]
    Closed,

    /// The frame could not be enqueued before the write timeout elapsed.
    #[error("channel write timed out")]
    Timeout,
}
