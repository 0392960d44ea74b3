// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renzzle Server - HTTP API
//!
//! Exposes the operations of `renzzle-core` over JSON/HTTP. Every response is
//! wrapped in the [`response::ApiResponse`] envelope; failures carry the
//! stable error code of the underlying [`renzzle_core::CoreError`].
//!
//! The caller is identified by the `X-User-Id` header (see [`extract`]),
//! which an authenticating gateway in front of this server sets.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
