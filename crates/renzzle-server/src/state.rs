// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Application state shared by all handlers.

use std::sync::Arc;
use std::time::Instant;

use renzzle_core::Store;
use renzzle_core::diagnostics::DiagnosticsService;
use renzzle_core::lesson::LessonService;
use renzzle_core::user::UserService;

/// Shared state for the HTTP handlers.
pub struct AppState {
    /// Lesson puzzle operations.
    pub lessons: LessonService,
    /// User and social-graph operations.
    pub users: UserService,
    /// Self-test operations.
    pub diagnostics: DiagnosticsService,
    /// When the server started (for uptime calculation).
    pub start_time: Instant,
    /// Server version string.
    pub version: String,
}

impl AppState {
    /// Wire every service to the same store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            lessons: LessonService::new(store.clone()),
            users: UserService::new(store.clone()),
            diagnostics: DiagnosticsService::new(store),
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}
