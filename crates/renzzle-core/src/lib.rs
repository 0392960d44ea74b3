// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renzzle Core - renju puzzle domain and storage
//!
//! This crate holds everything behind the HTTP surface of the renzzle
//! backend: the board key generator, the lesson index allocator, the social
//! graph (likes and subscriptions) and the store that persists them to
//! PostgreSQL or SQLite.
//!
//! # Layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`board`] | Parse renju move sequences and derive symmetry-invariant board keys |
//! | [`allocator`] | Decide where a new lesson puzzle goes in its chapter |
//! | [`lesson`] | Create, list, delete and solve lesson puzzles |
//! | [`user`] | Profiles, likes, subscriptions, community puzzles |
//! | [`diagnostics`] | Self-test operations over the typed and raw storage paths |
//! | [`persistence`] | The [`persistence::Store`] trait and its two backends |
//! | [`migrations`] | Embedded schema migrations |
//!
//! # Lesson ordering
//!
//! Lesson puzzles in a chapter carry dense zero-based indices. Inserting at
//! index `k` moves every puzzle at `k` or above up by one; deleting moves
//! every later puzzle down by one. Both run inside one store transaction
//! that holds the chapter's write lock, so concurrent writers never observe
//! or produce a gap or a duplicate.
//!
//! # Errors
//!
//! Every operation returns [`error::CoreError`], whose
//! [`error_code`](error::CoreError::error_code) is stable and is what API
//! clients see.

#![deny(missing_docs)]

pub mod allocator;
pub mod board;
pub mod diagnostics;
pub mod error;
pub mod lesson;
pub mod migrations;
pub mod model;
pub mod persistence;
pub mod puzzle;
pub mod user;

pub use error::{CoreError, Result};
pub use persistence::{PostgresStore, SqliteStore, Store};
