// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed store implementation.
//!
//! Writers to the same chapter are serialised with a transaction-scoped
//! advisory lock; like and subscription toggles lock the row they count on.

use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;

use crate::allocator::IndexPlacement;
use crate::error::CoreError;
use crate::model::{Cursor, Page, UserLevel};

use super::{
    CommunityPuzzleRecord, DiagnosticEntity, LessonProgress, LessonPuzzleRecord,
    LessonPuzzleSummary, LikeRecord, NewCommunityPuzzle, NewLessonPuzzle, Store,
    SubscriptionRecord, UserRecord,
};

/// First key of the two-key advisory lock taken on a chapter; the chapter
/// number is the second.
pub const LESSON_LOCK_NAMESPACE: i32 = 0x524e_5a4c;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres-backed store from an existing, migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Insert a user with the default level.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    nickname: &str,
) -> Result<UserRecord, CoreError> {
    let record = sqlx::query_as::<_, UserRecord>(concat!(
        "INSERT INTO users (email, nickname) VALUES ($1, $2) RETURNING ",
        user_columns!()
    ))
    .bind(email)
    .bind(nickname)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Get a user by id.
pub async fn get_user(pool: &PgPool, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
    let record = sqlx::query_as::<_, UserRecord>(concat!(
        "SELECT ",
        user_columns!(),
        " FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Delete a user, withdrawing their likes from the counters first.
pub async fn delete_user(pool: &PgPool, user_id: i64) -> Result<bool, CoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE community_puzzles p
        SET like_count = p.like_count - 1
        FROM likes l
        WHERE l.puzzle_id = p.id AND l.user_id = $1
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Set a user's level.
pub async fn update_user_level(
    pool: &PgPool,
    user_id: i64,
    level: UserLevel,
) -> Result<Option<UserRecord>, CoreError> {
    let record = sqlx::query_as::<_, UserRecord>(concat!(
        "UPDATE users SET level = $2 WHERE id = $1 RETURNING ",
        user_columns!()
    ))
    .bind(user_id)
    .bind(level.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

// ============================================================================
// Lesson puzzles
// ============================================================================

async fn lock_chapter(conn: &mut PgConnection, chapter: i32) -> Result<(), CoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(LESSON_LOCK_NAMESPACE)
        .bind(chapter)
        .execute(conn)
        .await?;
    Ok(())
}

async fn top_index(conn: &mut PgConnection, chapter: i32) -> Result<i32, CoreError> {
    let top: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(lesson_index), -1) FROM lesson_puzzles WHERE chapter = $1",
    )
    .bind(chapter)
    .fetch_one(conn)
    .await?;
    Ok(top)
}

/// Place and insert a lesson puzzle under the chapter lock.
pub async fn insert_lesson_puzzle(
    pool: &PgPool,
    puzzle: &NewLessonPuzzle,
) -> Result<LessonPuzzleRecord, CoreError> {
    let mut tx = pool.begin().await?;
    lock_chapter(&mut tx, puzzle.chapter).await?;

    let top = top_index(&mut tx, puzzle.chapter).await?;
    let placement = IndexPlacement::resolve(top, puzzle.requested_index)?;

    if let Some(from) = placement.shift_from {
        debug!(chapter = puzzle.chapter, from, "Shifting lesson indexes up");
        sqlx::query(
            r#"
            UPDATE lesson_puzzles
            SET lesson_index = lesson_index + 1
            WHERE chapter = $1 AND lesson_index >= $2
            "#,
        )
        .bind(puzzle.chapter)
        .bind(from)
        .execute(&mut *tx)
        .await?;
    }

    let record = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
        r#"
        INSERT INTO lesson_puzzles
            (chapter, lesson_index, title, board_status, board_key, depth,
             description, difficulty, win_color)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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

/// Get a lesson puzzle by id.
pub async fn get_lesson_puzzle(
    pool: &PgPool,
    lesson_id: i64,
) -> Result<Option<LessonPuzzleRecord>, CoreError> {
    let record = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
        "SELECT ",
        lesson_columns!(),
        " FROM lesson_puzzles WHERE id = $1"
    ))
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Delete a lesson puzzle and close the gap it leaves.
pub async fn delete_lesson_puzzle(
    pool: &PgPool,
    lesson_id: i64,
) -> Result<Option<LessonPuzzleRecord>, CoreError> {
    let mut tx = pool.begin().await?;

    let chapter: Option<i32> =
        sqlx::query_scalar("SELECT chapter FROM lesson_puzzles WHERE id = $1")
            .bind(lesson_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(chapter) = chapter else {
        return Ok(None);
    };
    lock_chapter(&mut tx, chapter).await?;

    let removed = sqlx::query_as::<_, LessonPuzzleRecord>(concat!(
        "DELETE FROM lesson_puzzles WHERE id = $1 RETURNING ",
        lesson_columns!()
    ))
    .bind(lesson_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(record) = &removed {
        sqlx::query(
            r#"
            UPDATE lesson_puzzles
            SET lesson_index = lesson_index - 1
            WHERE chapter = $1 AND lesson_index > $2
            "#,
        )
        .bind(record.chapter)
        .bind(record.lesson_index)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed)
}

/// One page of a chapter, flagged with the user's solved state.
pub async fn list_lesson_puzzles(
    pool: &PgPool,
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
                   WHERE s.lesson_puzzle_id = p.id AND s.user_id = $2
               ) AS is_solved
        FROM lesson_puzzles p
        WHERE p.chapter = $1
        ORDER BY p.lesson_index ASC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(chapter)
    .bind(user_id)
    .bind(page.size)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Record that a user solved a lesson puzzle.
pub async fn mark_lesson_solved(
    pool: &PgPool,
    user_id: i64,
    lesson_id: i64,
) -> Result<bool, CoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO solved_lesson_puzzles (user_id, lesson_puzzle_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, lesson_puzzle_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count solved and total puzzles of a chapter.
pub async fn lesson_progress(
    pool: &PgPool,
    chapter: i32,
    user_id: i64,
) -> Result<LessonProgress, CoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(s.user_id) AS solved
        FROM lesson_puzzles p
        LEFT JOIN solved_lesson_puzzles s
            ON s.lesson_puzzle_id = p.id AND s.user_id = $2
        WHERE p.chapter = $1
        "#,
    )
    .bind(chapter)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(LessonProgress {
        chapter,
        solved: row.try_get("solved")?,
        total: row.try_get("total")?,
    })
}

// ============================================================================
// Community puzzles
// ============================================================================

/// Insert a community puzzle.
pub async fn insert_community_puzzle(
    pool: &PgPool,
    puzzle: &NewCommunityPuzzle,
) -> Result<CommunityPuzzleRecord, CoreError> {
    let record = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
        r#"
        INSERT INTO community_puzzles
            (user_id, title, board_status, board_key, depth, description,
             difficulty, win_color)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Get a community puzzle by id.
pub async fn get_community_puzzle(
    pool: &PgPool,
    puzzle_id: i64,
) -> Result<Option<CommunityPuzzleRecord>, CoreError> {
    let record = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
        "SELECT ",
        community_columns!(),
        " FROM community_puzzles WHERE id = $1"
    ))
    .bind(puzzle_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Delete a community puzzle.
pub async fn delete_community_puzzle(pool: &PgPool, puzzle_id: i64) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM community_puzzles WHERE id = $1")
        .bind(puzzle_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// A user's own puzzles, newest first.
pub async fn list_user_community_puzzles(
    pool: &PgPool,
    user_id: i64,
    cursor: Cursor,
) -> Result<Vec<CommunityPuzzleRecord>, CoreError> {
    let records = sqlx::query_as::<_, CommunityPuzzleRecord>(concat!(
        "SELECT ",
        community_columns!(),
        r#"
        FROM community_puzzles
        WHERE user_id = $1 AND id < $2
        ORDER BY id DESC
        LIMIT $3
        "#
    ))
    .bind(user_id)
    .bind(cursor.upper_bound())
    .bind(cursor.size)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

// ============================================================================
// Likes
// ============================================================================

/// Flip a like and adjust the puzzle's counter in the same transaction.
pub async fn toggle_like(pool: &PgPool, user_id: i64, puzzle_id: i64) -> Result<bool, CoreError> {
    let mut tx = pool.begin().await?;

    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM community_puzzles WHERE id = $1 FOR UPDATE")
            .bind(puzzle_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(CoreError::PuzzleNotFound { puzzle_id });
    }

    let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND puzzle_id = $2")
        .bind(user_id)
        .bind(puzzle_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;

    let delta: i64 = if removed {
        -1
    } else {
        sqlx::query("INSERT INTO likes (user_id, puzzle_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await?;
        1
    };

    sqlx::query("UPDATE community_puzzles SET like_count = like_count + $2 WHERE id = $1")
        .bind(puzzle_id)
        .bind(delta)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(!removed)
}

/// Puzzles a user liked, most recent like first.
pub async fn list_likes(
    pool: &PgPool,
    user_id: i64,
    cursor: Cursor,
) -> Result<Vec<LikeRecord>, CoreError> {
    let records = sqlx::query_as::<_, LikeRecord>(
        r#"
        SELECT l.id, l.puzzle_id, p.title, p.user_id AS author_id, p.difficulty,
               p.like_count, l.created_at AS liked_at
        FROM likes l
        JOIN community_puzzles p ON p.id = l.puzzle_id
        WHERE l.user_id = $1 AND l.id < $2
        ORDER BY l.id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(cursor.upper_bound())
    .bind(cursor.size)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Flip a subscription. The subscriber's row is locked so two toggles from
/// the same user cannot interleave.
pub async fn toggle_subscription(
    pool: &PgPool,
    subscriber_id: i64,
    subscribed_id: i64,
) -> Result<bool, CoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(subscriber_id)
        .execute(&mut *tx)
        .await?;

    let removed =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND subscribed_id = $2")
            .bind(subscriber_id)
            .bind(subscribed_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

    if !removed {
        sqlx::query("INSERT INTO subscriptions (subscriber_id, subscribed_id) VALUES ($1, $2)")
            .bind(subscriber_id)
            .bind(subscribed_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(!removed)
}

/// Users someone follows, most recent first.
pub async fn list_subscriptions(
    pool: &PgPool,
    subscriber_id: i64,
    cursor: Cursor,
) -> Result<Vec<SubscriptionRecord>, CoreError> {
    let records = sqlx::query_as::<_, SubscriptionRecord>(
        r#"
        SELECT s.id, u.id AS user_id, u.nickname, u.level, s.created_at AS subscribed_at
        FROM subscriptions s
        JOIN users u ON u.id = s.subscribed_id
        WHERE s.subscriber_id = $1 AND s.id < $2
        ORDER BY s.id DESC
        LIMIT $3
        "#,
    )
    .bind(subscriber_id)
    .bind(cursor.upper_bound())
    .bind(cursor.size)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Check database connectivity.
pub async fn health_check_db(pool: &PgPool) -> Result<bool, CoreError> {
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;
    Ok(row.0 == 1)
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn create_user(&self, email: &str, nickname: &str) -> Result<UserRecord, CoreError> {
        create_user(&self.pool, email, nickname).await
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
        get_user(&self.pool, user_id).await
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, CoreError> {
        delete_user(&self.pool, user_id).await
    }

    async fn update_user_level(
        &self,
        user_id: i64,
        level: UserLevel,
    ) -> Result<Option<UserRecord>, CoreError> {
        update_user_level(&self.pool, user_id, level).await
    }

    async fn insert_lesson_puzzle(
        &self,
        puzzle: &NewLessonPuzzle,
    ) -> Result<LessonPuzzleRecord, CoreError> {
        insert_lesson_puzzle(&self.pool, puzzle).await
    }

    async fn get_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError> {
        get_lesson_puzzle(&self.pool, lesson_id).await
    }

    async fn delete_lesson_puzzle(
        &self,
        lesson_id: i64,
    ) -> Result<Option<LessonPuzzleRecord>, CoreError> {
        delete_lesson_puzzle(&self.pool, lesson_id).await
    }

    async fn list_lesson_puzzles(
        &self,
        chapter: i32,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<LessonPuzzleSummary>, CoreError> {
        list_lesson_puzzles(&self.pool, chapter, user_id, page).await
    }

    async fn mark_lesson_solved(&self, user_id: i64, lesson_id: i64) -> Result<bool, CoreError> {
        mark_lesson_solved(&self.pool, user_id, lesson_id).await
    }

    async fn lesson_progress(
        &self,
        chapter: i32,
        user_id: i64,
    ) -> Result<LessonProgress, CoreError> {
        lesson_progress(&self.pool, chapter, user_id).await
    }

    async fn insert_community_puzzle(
        &self,
        puzzle: &NewCommunityPuzzle,
    ) -> Result<CommunityPuzzleRecord, CoreError> {
        insert_community_puzzle(&self.pool, puzzle).await
    }

    async fn get_community_puzzle(
        &self,
        puzzle_id: i64,
    ) -> Result<Option<CommunityPuzzleRecord>, CoreError> {
        get_community_puzzle(&self.pool, puzzle_id).await
    }

    async fn delete_community_puzzle(&self, puzzle_id: i64) -> Result<bool, CoreError> {
        delete_community_puzzle(&self.pool, puzzle_id).await
    }

    async fn list_user_community_puzzles(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<CommunityPuzzleRecord>, CoreError> {
        list_user_community_puzzles(&self.pool, user_id, cursor).await
    }

    async fn toggle_like(&self, user_id: i64, puzzle_id: i64) -> Result<bool, CoreError> {
        toggle_like(&self.pool, user_id, puzzle_id).await
    }

    async fn list_likes(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<LikeRecord>, CoreError> {
        list_likes(&self.pool, user_id, cursor).await
    }

    async fn toggle_subscription(
        &self,
        subscriber_id: i64,
        subscribed_id: i64,
    ) -> Result<bool, CoreError> {
        toggle_subscription(&self.pool, subscriber_id, subscribed_id).await
    }

    async fn list_subscriptions(
        &self,
        subscriber_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<SubscriptionRecord>, CoreError> {
        list_subscriptions(&self.pool, subscriber_id, cursor).await
    }

    async fn save_diagnostic_entity(&self, name: &str) -> Result<DiagnosticEntity, CoreError> {
        let record = sqlx::query_as::<_, DiagnosticEntity>(
            "INSERT INTO diagnostic_entities (name) VALUES ($1) RETURNING id, name",
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
            "SELECT id, name FROM diagnostic_entities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn save_raw_entity(&self, name: &str) -> Result<i64, CoreError> {
        let row = sqlx::query("INSERT INTO diagnostic_raw_entities (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("id")?)
    }

    async fn find_raw_entity(&self, id: i64) -> Result<Option<DiagnosticEntity>, CoreError> {
        let row = sqlx::query("SELECT id, name FROM diagnostic_raw_entities WHERE id = $1")
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
        health_check_db(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::POSTGRES as MIGRATOR;
    use crate::model::{Difficulty, WinColor};
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        MIGRATOR.run(&pool).await.ok()?;
        Some(pool)
    }

    /// A chapter number no other test run is likely to use.
    fn fresh_chapter() -> i32 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        1_000_000 + (nanos % 1_000_000_000) as i32
    }

    fn lesson(chapter: i32, requested_index: Option<i32>, title: &str) -> NewLessonPuzzle {
        NewLessonPuzzle {
            chapter,
            requested_index,
            title: title.to_string(),
            board_status: "h8".to_string(),
            board_key: "key".to_string(),
            depth: 1,
            description: String::new(),
            difficulty: Difficulty::Middle,
            win_color: WinColor::Black,
        }
    }

    async fn cleanup_chapter(pool: &PgPool, chapter: i32) {
        sqlx::query("DELETE FROM lesson_puzzles WHERE chapter = $1")
            .bind(chapter)
            .execute(pool)
            .await
            .expect("Failed to clean up chapter");
    }

    async fn indexes(pool: &PgPool, chapter: i32) -> Vec<(i32, String)> {
        sqlx::query_as(
            "SELECT lesson_index, title FROM lesson_puzzles \
             WHERE chapter = $1 ORDER BY lesson_index",
        )
        .bind(chapter)
        .fetch_all(pool)
        .await
        .expect("Failed to read chapter")
    }

    #[tokio::test]
    async fn test_insert_shift_and_delete_compaction() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let chapter = fresh_chapter();

        for title in ["a", "b", "c"] {
            insert_lesson_puzzle(&pool, &lesson(chapter, None, title))
                .await
                .unwrap();
        }
        let inserted = insert_lesson_puzzle(&pool, &lesson(chapter, Some(0), "first"))
            .await
            .unwrap();
        assert_eq!(inserted.lesson_index, 0);
        assert_eq!(
            indexes(&pool, chapter).await,
            vec![
                (0, "first".into()),
                (1, "a".into()),
                (2, "b".into()),
                (3, "c".into())
            ]
        );

        delete_lesson_puzzle(&pool, inserted.id).await.unwrap();
        assert_eq!(
            indexes(&pool, chapter).await,
            vec![(0, "a".into()), (1, "b".into()), (2, "c".into())]
        );

        cleanup_chapter(&pool, chapter).await;
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_dense() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let chapter = fresh_chapter();
        let store = Arc::new(PostgresStore::new(pool.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert_lesson_puzzle(&lesson(chapter, None, &format!("p{}", i)))
                        .await
                })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap().unwrap();
        }

        let got: Vec<i32> = indexes(&pool, chapter)
            .await
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, (0..8).collect::<Vec<_>>());

        cleanup_chapter(&pool, chapter).await;
    }

    #[tokio::test]
    async fn test_toggle_like_counts() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let tag = fresh_chapter();
        let author = create_user(&pool, &format!("a{}@test", tag), &format!("a{}", tag))
            .await
            .unwrap();
        let puzzle = insert_community_puzzle(
            &pool,
            &NewCommunityPuzzle {
                user_id: author.id,
                title: "t".to_string(),
                board_status: "h8".to_string(),
                board_key: "k".to_string(),
                depth: 1,
                description: String::new(),
                difficulty: Difficulty::Low,
                win_color: WinColor::Black,
            },
        )
        .await
        .unwrap();

        assert!(toggle_like(&pool, author.id, puzzle.id).await.unwrap());
        let p = get_community_puzzle(&pool, puzzle.id).await.unwrap().unwrap();
        assert_eq!(p.like_count, 1);
        assert!(!toggle_like(&pool, author.id, puzzle.id).await.unwrap());
        let p = get_community_puzzle(&pool, puzzle.id).await.unwrap().unwrap();
        assert_eq!(p.like_count, 0);

        assert!(delete_user(&pool, author.id).await.unwrap());
        assert!(get_community_puzzle(&pool, puzzle.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_health_check() {
        let Some(pool) = test_pool().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        assert!(health_check_db(&pool).await.unwrap());
    }
}
