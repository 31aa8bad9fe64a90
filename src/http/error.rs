use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::moderation::ModerationError;

/// Error body: `error` is human-readable, `code` is stable and
/// machine-checkable.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            code: "bad_request",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            code: "not_found",
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            code: "unauthorized",
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
            code: "forbidden",
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
            code: "conflict",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: "internal",
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }
}

impl From<ModerationError> for AppError {
    fn from(err: ModerationError) -> Self {
        let status = match &err {
            ModerationError::SelfAction
            | ModerationError::TargetIsAdmin
            | ModerationError::AlreadyBanned
            | ModerationError::AlreadySuspended
            | ModerationError::MustActivateFirst
            | ModerationError::GroupSettled
            | ModerationError::InvalidPenaltyLevel
            | ModerationError::InvalidDuration => StatusCode::BAD_REQUEST,
            ModerationError::GroupNotFound
            | ModerationError::ContentNotFound
            | ModerationError::UserNotFound => StatusCode::NOT_FOUND,
            ModerationError::Database(db_err) => {
                tracing::error!(error = ?db_err, "moderation operation failed");
                return Self::internal("moderation operation failed");
            }
        };

        Self {
            status,
            message: err.to_string(),
            code: err.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}
