// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Caller identity extraction.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's id in the `X-User-Id` header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use renzzle_core::persistence::UserRecord;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, loaded from the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl CurrentUser {
    /// Caller's user id.
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

fn user_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header"))?;

    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::unauthorized("Invalid X-User-Id header"))
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = user_id(&parts.headers)?;
        let user = state.users.get_user(id).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(USER_ID_HEADER, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn test_parses_positive_id() {
        assert_eq!(user_id(&headers(Some(" 17 "))).unwrap(), 17);
    }

    #[test]
    fn test_rejects_missing_and_malformed() {
        for value in [None, Some("abc"), Some("0"), Some("-3")] {
            let err = user_id(&headers(value)).unwrap_err();
            assert_eq!(err.code(), "UNAUTHORIZED", "{:?}", value);
        }
    }
}
