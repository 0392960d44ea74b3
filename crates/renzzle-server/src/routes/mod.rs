// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP route handlers and router configuration

mod community;
mod diagnostics;
mod lesson;
mod user;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::response::ApiResponse;
use crate::state::AppState;

/// Cursor paging parameters: `id` is the last id already seen.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CursorParams {
    pub id: Option<i64>,
    pub size: Option<i64>,
}

/// Offset paging parameters.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Build the main application router.
///
/// Path parameters that share a position use the same name (`{id}`) because
/// the router cannot tell two differently named captures apart.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Users
        .route(
            "/api/user",
            post(user::create_user)
                .get(user::get_user)
                .delete(user::delete_user),
        )
        .route("/api/user/level", patch(user::update_level))
        .route("/api/user/like", post(user::toggle_like).get(user::list_likes))
        .route(
            "/api/user/subscribe",
            post(user::toggle_subscription).get(user::list_subscriptions),
        )
        .route("/api/user/{id}/puzzle", get(user::list_user_puzzles))
        .route("/api/user/{id}", delete(user::delete_user_puzzle))
        // Community puzzles
        .route("/api/community/puzzle", post(community::create_puzzle))
        // Lesson puzzles
        .route("/api/lesson", post(lesson::create))
        .route("/api/lesson/{id}", get(lesson::list).delete(lesson::delete))
        .route("/api/lesson/{id}/progress", get(lesson::progress))
        .route("/api/lesson/{id}/solve", post(lesson::solve))
        // Diagnostics
        .route("/api/test/hello/{name}", get(diagnostics::hello))
        .route("/api/test/save/jpa", post(diagnostics::save_typed))
        .route("/api/test/save/jdbc", post(diagnostics::save_raw))
        .route("/api/test/find/jpa/{id}", get(diagnostics::find_typed))
        .route("/api/test/find/jdbc/{id}", get(diagnostics::find_raw))
        .route("/api/test/clear", delete(diagnostics::clear))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_ms: i64,
    database: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.diagnostics.store_healthy().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        ApiResponse::success(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            version: state.version.clone(),
            uptime_ms: state.uptime_ms(),
            database,
        }),
    )
}
