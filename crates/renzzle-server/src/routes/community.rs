// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `/api/community` handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use renzzle_core::persistence::CommunityPuzzleRecord;
use renzzle_core::user::CreateCommunityPuzzleRequest;

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) async fn create_puzzle(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    body: Result<Json<CreateCommunityPuzzleRequest>, JsonRejection>,
) -> ApiResult<CommunityPuzzleRecord> {
    let Json(request) = body?;
    let puzzle = state
        .users
        .create_community_puzzle(caller.id(), &request)
        .await?;
    Ok(ApiResponse::success(puzzle))
}
