// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for renzzle-core.
//!
//! This module defines the store abstraction and backend implementations.

// Column lists shared by both backends so that every query maps onto the
// record structs below in the same way.

macro_rules! user_columns {
    () => {
        "id, email, nickname, level, created_at"
    };
}

macro_rules! lesson_columns {
    () => {
        "id, chapter, lesson_index, title, board_status, board_key, depth, description, \
         difficulty, win_color, created_at"
    };
}

macro_rules! community_columns {
    () => {
        "id, user_id, title, board_status, board_key, depth, description, difficulty, \
         win_color, like_count, created_at"
    };
}

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{Cursor, Difficulty, Page, UserLevel, WinColor};

/// User record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Database primary key.
    pub id: i64,
    /// Unique login email.
    pub email: String,
    /// Unique display name.
    pub nickname: String,
    /// Self-declared level.
    #[sqlx(try_from = "String")]
    pub level: UserLevel,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Lesson puzzle record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPuzzleRecord {
    /// Database primary key.
    pub id: i64,
    /// Chapter the puzzle belongs to.
    pub chapter: i32,
    /// Zero-based position within the chapter.
    pub lesson_index: i32,
    /// Title shown in the lesson list.
    pub title: String,
    /// Move sequence of the starting position.
    pub board_status: String,
    /// Canonical key derived from `board_status`.
    pub board_key: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Free-form hint text.
    pub description: String,
    /// Puzzle difficulty.
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    /// Colour that wins.
    #[sqlx(try_from = "String")]
    pub win_color: WinColor,
    /// When the puzzle was created.
    pub created_at: DateTime<Utc>,
}

/// One row of a chapter listing, flagged for the requesting user.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPuzzleSummary {
    /// Database primary key.
    pub id: i64,
    /// Zero-based position within the chapter.
    pub lesson_index: i32,
    /// Title.
    pub title: String,
    /// Move sequence of the starting position.
    pub board_status: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Free-form hint text.
    pub description: String,
    /// Puzzle difficulty.
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    /// Colour that wins.
    #[sqlx(try_from = "String")]
    pub win_color: WinColor,
    /// Whether the requesting user has solved it.
    pub is_solved: bool,
}

/// Solved/total counters for one chapter and user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    /// Chapter counted.
    pub chapter: i32,
    /// Puzzles the user solved in the chapter.
    pub solved: i64,
    /// Puzzles in the chapter.
    pub total: i64,
}

/// Community puzzle record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPuzzleRecord {
    /// Database primary key.
    pub id: i64,
    /// Author.
    pub user_id: i64,
    /// Title.
    pub title: String,
    /// Move sequence of the starting position.
    pub board_status: String,
    /// Canonical key derived from `board_status`.
    pub board_key: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Free-form hint text.
    pub description: String,
    /// Puzzle difficulty.
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    /// Colour that wins.
    #[sqlx(try_from = "String")]
    pub win_color: WinColor,
    /// Number of likes.
    pub like_count: i64,
    /// When the puzzle was created.
    pub created_at: DateTime<Utc>,
}

/// A liked puzzle as seen from the liking user.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
    /// Like id, used as the paging cursor.
    pub id: i64,
    /// Liked community puzzle.
    pub puzzle_id: i64,
    /// Puzzle title.
    pub title: String,
    /// Puzzle author.
    pub author_id: i64,
    /// Puzzle difficulty.
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    /// Current like count of the puzzle.
    pub like_count: i64,
    /// When the like was given.
    pub liked_at: DateTime<Utc>,
}

/// A followed user as seen from the subscriber.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    /// Subscription id, used as the paging cursor.
    pub id: i64,
    /// Followed user.
    pub user_id: i64,
    /// Followed user's nickname.
    pub nickname: String,
    /// Followed user's level.
    #[sqlx(try_from = "String")]
    pub level: UserLevel,
    /// When the subscription was made.
    pub subscribed_at: DateTime<Utc>,
}

/// Row of the diagnostic tables.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct DiagnosticEntity {
    /// Database primary key.
    pub id: i64,
    /// Stored name.
    pub name: String,
}

/// A validated lesson puzzle ready to be stored.
#[derive(Debug, Clone)]
pub struct NewLessonPuzzle {
    /// Target chapter.
    pub chapter: i32,
    /// Position to insert at, `None` to append.
    pub requested_index: Option<i32>,
    /// Title.
    pub title: String,
    /// Move sequence.
    pub board_status: String,
    /// Key derived from `board_status`.
    pub board_key: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Hint text.
    pub description: String,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Winning colour.
    pub win_color: WinColor,
}

/// A validated community puzzle ready to be stored.
#[derive(Debug, Clone)]
pub struct NewCommunityPuzzle {
    /// Author.
    pub user_id: i64,
    /// Title.
    pub title: String,
    /// Move sequence.
    pub board_status: String,
    /// Key derived from `board_status`.
    pub board_key: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Hint text.
    pub description: String,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Winning colour.
    pub win_color: WinColor,
}

/// Persistence interface used by the services.
///
/// Every method that changes more than one row runs in a single transaction.
/// `insert_lesson_puzzle` and `delete_lesson_puzzle` additionally hold a
/// per-chapter write lock for the duration of that transaction.
#[allow(missing_docs)]
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    async fn create_user(&self, email: &str, nickname: &str) -> Result<UserRecord, CoreError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError>;

    /// Returns false when no such user existed.
    async fn delete_user(&self, user_id: i64) -> Result<bool, CoreError>;

    async fn update_user_level(
        &self,
        user_id: i64,
        level: UserLevel,
    ) -> Result<Option<UserRecord>, CoreError>;

    // Lesson puzzles

    /// Allocate an index (shifting later puzzles when inserting) and store.
    async fn insert_lesson_puzzle(
        &self,
        puzzle: &NewLessonPuzzle,
    ) -> Result<LessonPuzzleRecord, CoreError>;

    async fn get_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError>;

    /// Delete and close the gap in the chapter. Returns the removed record.
    async fn delete_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError>;

    async fn list_lesson_puzzles(
        &self,
        chapter: i32,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<LessonPuzzleSummary>, CoreError>;

    /// Returns true when newly recorded.
    async fn mark_lesson_solved(&self, user_id: i64, lesson_id: i64) -> Result<bool, CoreError>;

    async fn lesson_progress(&self, chapter: i32, user_id: i64)
    -> Result<LessonProgress, CoreError>;

    // Community puzzles

    async fn insert_community_puzzle(
        &self,
        puzzle: &NewCommunityPuzzle,
    ) -> Result<CommunityPuzzleRecord, CoreError>;

    async fn get_community_puzzle(
        &self,
        puzzle_id: i64,
    ) -> Result<Option<CommunityPuzzleRecord>, CoreError>;

    async fn delete_community_puzzle(&self, puzzle_id: i64) -> Result<bool, CoreError>;

    async fn list_user_community_puzzles(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<CommunityPuzzleRecord>, CoreError>;

    // Likes

    /// Flip the like; `PuzzleNotFound` when the puzzle does not exist.
    /// Returns the new membership state.
    async fn toggle_like(&self, user_id: i64, puzzle_id: i64) -> Result<bool, CoreError>;

    async fn list_likes(&self, user_id: i64, cursor: Cursor)
    -> Result<Vec<LikeRecord>, CoreError>;

    // Subscriptions

    /// Flip the subscription; returns the new membership state.
    async fn toggle_subscription(
        &self,
        subscriber_id: i64,
        subscribed_id: i64,
    ) -> Result<bool, CoreError>;

    async fn list_subscriptions(
        &self,
        subscriber_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<SubscriptionRecord>, CoreError>;

    // Diagnostics

    /// Insert through typed record mapping.
    async fn save_diagnostic_entity(&self, name: &str) -> Result<DiagnosticEntity, CoreError>;

    async fn find_diagnostic_entity(&self, id: i64)
    -> Result<Option<DiagnosticEntity>, CoreError>;

    /// Insert through raw row access; returns the new id.
    async fn save_raw_entity(&self, name: &str) -> Result<i64, CoreError>;

    async fn find_raw_entity(&self, id: i64) -> Result<Option<DiagnosticEntity>, CoreError>;

    /// Remove all diagnostic rows; returns the number removed.
    async fn clear_diagnostics(&self) -> Result<u64, CoreError>;

    // Health

    async fn health_check(&self) -> Result<bool, CoreError>;
}
