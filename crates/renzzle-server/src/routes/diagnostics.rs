// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `/api/test` handlers for checking a deployment end to end.
//!
//! `jpa` routes go through typed record mapping, `jdbc` routes through raw
//! row access. The path names are kept for existing clients.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use renzzle_core::diagnostics::{HelloResponse, SaveEntityRequest};
use renzzle_core::persistence::DiagnosticEntity;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) async fn hello(
    State(state): State<Arc<AppState>>,
    name: Result<Path<String>, PathRejection>,
) -> ApiResult<HelloResponse> {
    let Path(name) = name?;
    Ok(ApiResponse::success(state.diagnostics.hello(&name)))
}

pub(crate) async fn save_typed(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SaveEntityRequest>, JsonRejection>,
) -> ApiResult<DiagnosticEntity> {
    let Json(request) = body?;
    let entity = state.diagnostics.save_entity(&request).await?;
    Ok(ApiResponse::success(entity))
}

pub(crate) async fn find_typed(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DiagnosticEntity> {
    let Path(id) = id?;
    let entity = state.diagnostics.find_entity(id).await?;
    Ok(ApiResponse::success(entity))
}

pub(crate) async fn save_raw(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SaveEntityRequest>, JsonRejection>,
) -> ApiResult<DiagnosticEntity> {
    let Json(request) = body?;
    let entity = state.diagnostics.save_raw_entity(&request).await?;
    Ok(ApiResponse::success(entity))
}

pub(crate) async fn find_raw(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<DiagnosticEntity> {
    let Path(id) = id?;
    let entity = state.diagnostics.find_raw_entity(id).await?;
    Ok(ApiResponse::success(entity))
}

pub(crate) async fn clear(State(state): State<Arc<AppState>>) -> ApiResult<bool> {
    let cleared = state.diagnostics.clear().await?;
    Ok(ApiResponse::success(cleared))
}
