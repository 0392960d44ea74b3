// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed store implementation.
//!
//! SQLite has a single writer, so instead of row or advisory locks this
//! backend serialises its multi-statement write transactions behind one
//! in-process mutex. Index shifts go through negative values because SQLite
//! checks the `(chapter, lesson_index)` unique constraint row by row.

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use tracing::debug;

use crate::allocator::IndexPlacement;
use crate::error::CoreError;
use crate::migrations::SQLITE as MIGRATOR;
use crate::model::{Cursor, Page, UserLevel};

use super::{
    CommunityPuzzleRecord, DiagnosticEntity, LessonProgress, LessonPuzzleRecord,
    LessonPuzzleSummary, LikeRecord, NewCommunityPuzzle, NewLessonPuzzle, Store,
    SubscriptionRecord, UserRecord,
};

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to a `sqlite:` URL and run migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {}: {}", url, e),
            })?;

        MIGRATOR.run(&pool).await?;

        Ok(Self::new(pool))
    }

    /// Create and initialize a new SQLite store from a file path.
    ///
    /// Creates parent directories and the database file when missing, then
    /// runs all migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::connect(&url, 5).await
    }
}

async fn top_index(conn: &mut SqliteConnection, chapter: i32) -> Result<i32, CoreError> {
    let top: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(lesson_index), -1) FROM lesson_puzzles WHERE chapter = ?",
    )
    .bind(chapter)
    .fetch_one(conn)
    .await?;
    Ok(top)
}

/// Move every index in `chapter` matching `lesson_index >= from` up by one.
async fn shift_up(conn: &mut SqliteConnection, chapter: i32, from: i32) -> Result<(), CoreError> {
    sqlx::query(
        r#"
        UPDATE lesson_puzzles
        SET lesson_index = -lesson_index - 1
        WHERE chapter = ? AND lesson_index >= ?
        "#,
    )
    .bind(chapter)
    .bind(from)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE lesson_puzzles
        SET lesson_index = -lesson_index
        WHERE chapter = ? AND lesson_index < 0
        "#,
    )
    .bind(chapter)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Move every index in `chapter` above `after` down by one.
async fn shift_down(
    conn: &mut SqliteConnection,
    chapter: i32,
    after: i32,
) -> Result<(), CoreError> {
    sqlx::query(
        r#"
        UPDATE lesson_puzzles
        SET lesson_index = -lesson_index
        WHERE chapter = ? AND lesson_index > ?
        "#,
    )
    .bind(chapter)
    .bind(after)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE lesson_puzzles
        SET lesson_index = -lesson_index - 1
        WHERE chapter = ? AND lesson_index < 0
        "#,
    )
    .bind(chapter)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, email: &str, nickname: &str) -> Result<UserRecord, CoreError> {
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "INSERT INTO users (email, nickname) VALUES (?, ?) RETURNING ",
            user_columns!()
        ))
        .bind(email)
        .bind(nickname)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, CoreError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        // Likes given by the user no longer count towards other puzzles.
        sqlx::query(
            r#"
            UPDATE community_puzzles
            SET like_count = like_count - 1
            WHERE id IN (SELECT puzzle_id FROM likes WHERE user_id = ?)
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_user_level(
        &self,
        user_id: i64,
        level: UserLevel,
    ) -> Result<Option<UserRecord>, CoreError> {
        let record = sqlx::query_as::<_, UserRecord>(concat!(
            "UPDATE users SET level = ? WHERE id = ? RETURNING ",
            user_columns!()
        ))
        .bind(level.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_lesson_puzzle(
        &self,
        puzzle: &NewLessonPuzzle,
    ) -> Result<LessonPuzzleRecord, CoreError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let top = top_index(&mut tx, puzzle.chapter).await?;
        let placement = IndexPlacement::resolve(top, puzzle.requested_index)?;

        if let Some(from) = placement.shift_from {
            debug!(chapter = puzzle.chapter, from, "Shifting lesson indexes up");
            shift_up(&mut tx, puzzle.chapter, from).await?;
        }

        let record = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
            r#"
            INSERT INTO lesson_puzzles
                (chapter, lesson_index, title, board_status, board_key, depth,
                 description, difficulty, win_color)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING "#,
            lesson_columns!()
        ))
        .bind(puzzle.chapter)
        .bind(placement.index)
        .bind(&puzzle.title)
        .bind(&puzzle.board_status)
        .bind(&puzzle.board_key)
        .bind(puzzle.depth)
        .bind(&puzzle.description)
        .bind(puzzle.difficulty.as_str())
        .bind(puzzle.win_color.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError> {
        let record = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
            "SELECT ",
            lesson_columns!(),
            " FROM lesson_puzzles WHERE id = ?"
        ))
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
            "DELETE FROM lesson_puzzles WHERE id = ? RETURNING ",
            lesson_columns!()
        ))
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(record) = &removed {
            shift_down(&mut tx, record.chapter, record.lesson_index).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn list_lesson_puzzles(
        &self,
        chapter: i32,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<LessonPuzzleSummary>, CoreError> {
        let records = sqlx::query_as::<_, LessonPuzzleSummary>(
            r#"
            SELECT p.id, p.lesson_index, p.title, p.board_status, p.depth, p.description,
                   p.difficulty, p.win_color,
                   EXISTS (
                       SELECT 1 FROM solved_lesson_puzzles s
                       WHERE s.lesson_puzzle_id = p.id AND s.user_id = ?
                   ) AS is_solved
            FROM lesson_puzzles p
            WHERE p.chapter = ?
            ORDER BY p.lesson_index ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(chapter)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn mark_lesson_solved(&self, user_id: i64, lesson_id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO solved_lesson_puzzles (user_id, lesson_puzzle_id)
            VALUES (?, ?)
            ON CONFLICT (user_id, lesson_puzzle_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn lesson_progress(
        &self,
        chapter: i32,
        user_id: i64,
    ) -> Result<LessonProgress, CoreError> {
        let (solved, total): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*)
                 FROM solved_lesson_puzzles s
                 JOIN lesson_puzzles p ON p.id = s.lesson_puzzle_id
                 WHERE p.chapter = ? AND s.user_id = ?),
                (SELECT COUNT(*) FROM lesson_puzzles WHERE chapter = ?)
            "#,
        )
        .bind(chapter)
        .bind(user_id)
        .bind(chapter)
        .fetch_one(&self.pool)
        .await?;

        Ok(LessonProgress {
            chapter,
            solved,
            total,
        })
    }

    async fn insert_community_puzzle(
        &self,
        puzzle: &NewCommunityPuzzle,
    ) -> Result<CommunityPuzzleRecord, CoreError> {
        let record = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
            r#"
            INSERT INTO community_puzzles
                (user_id, title, board_status, board_key, depth, description,
                 difficulty, win_color)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING "#,
            community_columns!()
        ))
        .bind(puzzle.user_id)
        .bind(&puzzle.title)
        .bind(&puzzle.board_status)
        .bind(&puzzle.board_key)
        .bind(puzzle.depth)
        .bind(&puzzle.description)
        .bind(puzzle.difficulty.as_str())
        .bind(puzzle.win_color.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_community_puzzle(
        &self,
        puzzle_id: i64,
    ) -> Result<Option<CommunityPuzzleRecord>, CoreError> {
        let record = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
            "SELECT ",
            community_columns!(),
            " FROM community_puzzles WHERE id = ?"
        ))
        .bind(puzzle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_community_puzzle(&self, puzzle_id: i64) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM community_puzzles WHERE id = ?")
            .bind(puzzle_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_user_community_puzzles(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<CommunityPuzzleRecord>, CoreError> {
        let records = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
            "SELECT ",
            community_columns!(),
            r#"
            FROM community_puzzles
            WHERE user_id = ? AND id < ?
            ORDER BY id DESC
            LIMIT ?
            "#
        ))
        .bind(user_id)
        .bind(cursor.upper_bound())
        .bind(cursor.size)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn toggle_like(&self, user_id: i64, puzzle_id: i64) -> Result<bool, CoreError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM community_puzzles WHERE id = ?")
                .bind(puzzle_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(CoreError::PuzzleNotFound { puzzle_id });
        }

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND puzzle_id = ?")
            .bind(user_id)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let delta: i64 = if removed {
            -1
        } else {
            sqlx::query("INSERT INTO likes (user_id, puzzle_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(puzzle_id)
                .execute(&mut *tx)
                .await?;
            1
        };

        sqlx::query("UPDATE community_puzzles SET like_count = like_count + ? WHERE id = ?")
            .bind(delta)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(!removed)
    }

    async fn list_likes(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<LikeRecord>, CoreError> {
        let records = sqlx::query_as::<_, LikeRecord>(
            r#"
            SELECT l.id, l.puzzle_id, p.title, p.user_id AS author_id, p.difficulty,
                   p.like_count, l.created_at AS liked_at
            FROM likes l
            JOIN community_puzzles p ON p.id = l.puzzle_id
            WHERE l.user_id = ? AND l.id < ?
            ORDER BY l.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(cursor.upper_bound())
        .bind(cursor.size)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn toggle_subscription(
        &self,
        subscriber_id: i64,
        subscribed_id: i64,
    ) -> Result<bool, CoreError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = ? AND subscribed_id = ?",
        )
        .bind(subscriber_id)
        .bind(subscribed_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO subscriptions (subscriber_id, subscribed_id) VALUES (?, ?)")
                .bind(subscriber_id)
                .bind(subscribed_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(!removed)
    }

    async fn list_subscriptions(
        &self,
        subscriber_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<SubscriptionRecord>, CoreError> {
        let records = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT s.id, u.id AS user_id, u.nickname, u.level, s.created_at AS subscribed_at
            FROM subscriptions s
            JOIN users u ON u.id = s.subscribed_id
            WHERE s.subscriber_id = ? AND s.id < ?
            ORDER BY s.id DESC
            LIMIT ?
            "#,
        )
        .bind(subscriber_id)
        .bind(cursor.upper_bound())
        .bind(cursor.size)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn save_diagnostic_entity(&self, name: &str) -> Result<DiagnosticEntity, CoreError> {
        let record = sqlx::query_as::<_, DiagnosticEntity>(
            "INSERT INTO diagnostic_entities (name) VALUES (?) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_diagnostic_entity(
        &self,
        id: i64,
    ) -> Result<Option<DiagnosticEntity>, CoreError> {
        let record = sqlx::query_as::<_, DiagnosticEntity>(
            "SELECT id, name FROM diagnostic_entities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn save_raw_entity(&self, name: &str) -> Result<i64, CoreError> {
        let result = sqlx::query("INSERT INTO diagnostic_raw_entities (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_raw_entity(&self, id: i64) -> Result<Option<DiagnosticEntity>, CoreError> {
        let row = sqlx::query("SELECT id, name FROM diagnostic_raw_entities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(DiagnosticEntity {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn clear_diagnostics(&self) -> Result<u64, CoreError> {
        let mut tx = self.pool.begin().await?;

        let typed = sqlx::query("DELETE FROM diagnostic_entities")
            .execute(&mut *tx)
            .await?;
        let raw = sqlx::query("DELETE FROM diagnostic_raw_entities")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(typed.rows_affected() + raw.rows_affected())
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
