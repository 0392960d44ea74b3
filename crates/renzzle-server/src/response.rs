// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The response envelope every endpoint answers with.
//!
//! ```json
//! { "isSuccess": true,  "response": { ... }, "errorResponse": null }
//! { "isSuccess": false, "response": null,
//!   "errorResponse": { "code": "...", "message": "..." } }
//! ```

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error part of a failed envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `USER_NOT_FOUND`.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Structured extra information, such as rejected fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub is_success: bool,
    /// Payload on success.
    pub response: Option<T>,
    /// Error on failure.
    pub error_response: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope around `payload`.
    pub fn success(payload: T) -> Self {
        Self {
            is_success: true,
            response: Some(payload),
            error_response: None,
        }
    }

    /// Failed envelope.
    pub fn failure(error: ErrorBody) -> Self {
        Self {
            is_success: false,
            response: None,
            error_response: Some(error),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let value = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(
            value,
            json!({"isSuccess": true, "response": 42, "errorResponse": null})
        );
    }

    #[test]
    fn test_unit_payload_is_null() {
        let value = serde_json::to_value(ApiResponse::success(())).unwrap();
        assert_eq!(value["response"], serde_json::Value::Null);
        assert_eq!(value["isSuccess"], true);
    }

    #[test]
    fn test_failure_shape_omits_empty_details() {
        let value = serde_json::to_value(ApiResponse::<()>::failure(ErrorBody {
            code: "CONFLICT".to_string(),
            message: "duplicate".to_string(),
            details: None,
        }))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "isSuccess": false,
                "response": null,
                "errorResponse": {"code": "CONFLICT", "message": "duplicate"}
            })
        );
    }
}
