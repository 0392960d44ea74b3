// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `/api/user` handlers: profile, likes, subscriptions and own puzzles.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use renzzle_core::model::Cursor;
use renzzle_core::persistence::{
    CommunityPuzzleRecord, LikeRecord, SubscriptionRecord, UserRecord,
};
use renzzle_core::user::CreateUserRequest;
use serde::Deserialize;
use tracing::info;

use super::CursorParams;
use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateLevelRequest {
    level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PuzzleLikeRequest {
    puzzle_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionRequest {
    user_id: i64,
}

pub(crate) async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<UserRecord> {
    let Json(request) = body?;
    let user = state.users.create_user(&request).await?;
    Ok(ApiResponse::success(user))
}

pub(crate) async fn get_user(CurrentUser(user): CurrentUser) -> ApiResult<UserRecord> {
    Ok(ApiResponse::success(user))
}

pub(crate) async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
) -> ApiResult<i64> {
    let deleted = state.users.delete_user(caller.id()).await?;
    Ok(ApiResponse::success(deleted))
}

pub(crate) async fn update_level(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    body: Result<Json<UpdateLevelRequest>, JsonRejection>,
) -> ApiResult<UserRecord> {
    let Json(request) = body?;
    let user = state
        .users
        .update_user_level(caller.id(), &request.level)
        .await?;
    Ok(ApiResponse::success(user))
}

pub(crate) async fn toggle_like(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    body: Result<Json<PuzzleLikeRequest>, JsonRejection>,
) -> ApiResult<bool> {
    let Json(request) = body?;
    info!(puzzle_id = request.puzzle_id, "Received request to change like status");
    let liked = state
        .users
        .toggle_like(request.puzzle_id, caller.id())
        .await?;
    Ok(ApiResponse::success(liked))
}

pub(crate) async fn list_likes(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    params: Result<Query<CursorParams>, QueryRejection>,
) -> ApiResult<Vec<LikeRecord>> {
    let Query(params) = params?;
    let cursor = Cursor::new(params.id, params.size)?;
    let likes = state.users.get_user_likes(caller.id(), cursor).await?;
    Ok(ApiResponse::success(likes))
}

pub(crate) async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    body: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> ApiResult<bool> {
    let Json(request) = body?;
    let subscribed = state
        .users
        .change_subscription(caller.id(), request.user_id)
        .await?;
    Ok(ApiResponse::success(subscribed))
}

pub(crate) async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    params: Result<Query<CursorParams>, QueryRejection>,
) -> ApiResult<Vec<SubscriptionRecord>> {
    let Query(params) = params?;
    let cursor = Cursor::new(params.id, params.size)?;
    let subscriptions = state
        .users
        .get_user_subscriptions(caller.id(), cursor)
        .await?;
    Ok(ApiResponse::success(subscriptions))
}

pub(crate) async fn list_user_puzzles(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<i64>, PathRejection>,
    params: Result<Query<CursorParams>, QueryRejection>,
) -> ApiResult<Vec<CommunityPuzzleRecord>> {
    let Path(user_id) = user_id?;
    let Query(params) = params?;
    let cursor = Cursor::new(params.id, params.size)?;
    let puzzles = state
        .users
        .get_user_community_puzzles(user_id, cursor)
        .await?;
    Ok(ApiResponse::success(puzzles))
}

pub(crate) async fn delete_user_puzzle(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    puzzle_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let Path(puzzle_id) = puzzle_id?;
    state
        .users
        .delete_user_puzzle(puzzle_id, caller.id())
        .await?;
    Ok(ApiResponse::success(()))
}
