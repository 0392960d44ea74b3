// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server error type with HTTP status code mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use renzzle_core::CoreError;
use thiserror::Error;
use tracing::error;

use crate::response::{ApiResponse, ErrorBody};

/// Result type of every handler.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Errors a request can end in.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Domain or storage error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Caller identity missing or malformed.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed body, path or query string.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Create an unauthorized error (401)
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e {
                CoreError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
                CoreError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                CoreError::Conflict { .. } => StatusCode::CONFLICT,
                e if e.is_not_found() => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Core(e) => e.error_code(),
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            // Storage details stay in the log.
            ApiError::Core(CoreError::DatabaseError { .. }) => ErrorBody {
                code: self.code().to_string(),
                message: "Internal database error".to_string(),
                details: None,
            },
            ApiError::Core(CoreError::ValidationFailed { errors }) => ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details: serde_json::to_value(errors).ok(),
            },
            _ => ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }

        (status, ApiResponse::<()>::failure(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (ApiError::from(CoreError::validation("title", "x")), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("missing"), StatusCode::UNAUTHORIZED),
            (
                ApiError::from(CoreError::PermissionDenied {
                    user_id: 1,
                    resource: "community puzzle 2".to_string(),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(CoreError::UserNotFound { user_id: 1 }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(CoreError::Conflict {
                    reason: "dup".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CoreError::DatabaseError {
                    operation: "query".to_string(),
                    details: "boom".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::BadRequest("bad".to_string()), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_database_details_are_hidden() {
        let error = ApiError::from(CoreError::DatabaseError {
            operation: "query".to_string(),
            details: "password=secret".to_string(),
        });
        let body = error.body();
        assert_eq!(body.code, "DATABASE_ERROR");
        assert!(!body.message.contains("secret"));
    }

    #[test]
    fn test_validation_details_list_fields() {
        let error = ApiError::from(CoreError::validation("depth", "must be at least 1"));
        let details = error.body().details.unwrap();
        assert_eq!(details[0]["field"], "depth");
    }
}
