// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `/api/lesson` handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use renzzle_core::lesson::CreateLessonPuzzleRequest;
use renzzle_core::model::Page;
use renzzle_core::persistence::{LessonProgress, LessonPuzzleRecord, LessonPuzzleSummary};

use super::PageParams;
use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateLessonPuzzleRequest>, JsonRejection>,
) -> ApiResult<LessonPuzzleRecord> {
    let Json(request) = body?;
    let puzzle = state.lessons.create_lesson_puzzle(&request).await?;
    Ok(ApiResponse::success(puzzle))
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    chapter: Result<Path<i32>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Vec<LessonPuzzleSummary>> {
    let Path(chapter) = chapter?;
    let Query(params) = params?;
    let page = Page::new(params.page, params.size)?;
    let puzzles = state
        .lessons
        .list_lesson_puzzles(chapter, caller.id(), page)
        .await?;
    Ok(ApiResponse::success(puzzles))
}

pub(crate) async fn progress(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    chapter: Result<Path<i32>, PathRejection>,
) -> ApiResult<LessonProgress> {
    let Path(chapter) = chapter?;
    let progress = state.lessons.lesson_progress(chapter, caller.id()).await?;
    Ok(ApiResponse::success(progress))
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<LessonPuzzleRecord> {
    let Path(lesson_id) = lesson_id?;
    let removed = state.lessons.delete_lesson_puzzle(lesson_id).await?;
    Ok(ApiResponse::success(removed))
}

pub(crate) async fn solve(
    State(state): State<Arc<AppState>>,
    caller: CurrentUser,
    lesson_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<bool> {
    let Path(lesson_id) = lesson_id?;
    let newly_solved = state
        .lessons
        .solve_lesson_puzzle(lesson_id, caller.id())
        .await?;
    Ok(ApiResponse::success(newly_solved))
}
