use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Wire shape for every error the API returns.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Wire shape for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

/// An HTTP-facing error: status code plus a stable `{error, message}` pair.
#[derive(Debug, thiserror::Error)]
#[error("{status} {label}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub label: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, label: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            label,
            message: message.into(),
        }
    }

    /// Request body failed the shape pass (missing field, bad JSON, ...).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.label.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
