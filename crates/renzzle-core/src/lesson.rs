// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lesson puzzle service.
//!
//! Lesson puzzles are ordered within a chapter by a dense zero-based index.
//! Creating one either appends it or inserts it at a requested index, moving
//! later puzzles up; deleting one moves later puzzles down. Both happen in a
//! single store transaction (see [`crate::allocator`]).

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::{CoreError, FieldErrors, Result};
use crate::model::Page;
use crate::persistence::{
    LessonProgress, LessonPuzzleRecord, LessonPuzzleSummary, NewLessonPuzzle, Store,
};
use crate::puzzle::RawPuzzle;

/// Body of a create-lesson-puzzle request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonPuzzleRequest {
    /// Target chapter, starting at 1.
    pub chapter: i32,
    /// Position to insert at; appended when absent.
    #[serde(default)]
    pub puzzle_index: Option<i32>,
    /// Title.
    pub title: String,
    /// Move sequence in renju notation.
    pub board_status: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Hint text.
    #[serde(default)]
    pub description: String,
    /// `LOW`, `MIDDLE` or `HIGH`, any case.
    pub difficulty: String,
    /// `BLACK` or `WHITE`, any case.
    pub win_color: String,
}

impl CreateLessonPuzzleRequest {
    /// Validate every field and derive the board key.
    ///
    /// Whether `puzzleIndex` leaves a gap can only be decided against the
    /// chapter's current contents, so that check happens in the store.
    pub fn validate(&self) -> Result<NewLessonPuzzle> {
        let mut errors = FieldErrors::new();

        errors.check(self.chapter < 1, "chapter", "must be at least 1");
        errors.check(
            self.puzzle_index.is_some_and(|i| i < 0),
            "puzzleIndex",
            "must not be negative",
        );

        let body = RawPuzzle {
            title: &self.title,
            board_status: &self.board_status,
            depth: self.depth,
            description: &self.description,
            difficulty: &self.difficulty,
            win_color: &self.win_color,
        }
        .check(&mut errors);

        match body {
            Some(body) => Ok(NewLessonPuzzle {
                chapter: self.chapter,
                requested_index: self.puzzle_index,
                title: body.title,
                board_status: body.board_status,
                board_key: body.board_key,
                depth: body.depth,
                description: body.description,
                difficulty: body.difficulty,
                win_color: body.win_color,
            }),
            None => Err(errors.into_error()),
        }
    }
}

/// Lesson puzzle operations.
#[derive(Clone)]
pub struct LessonService {
    store: Arc<dyn Store>,
}

impl LessonService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate and store a new lesson puzzle, allocating its index.
    #[instrument(skip(self, request), fields(chapter = request.chapter))]
    pub async fn create_lesson_puzzle(
        &self,
        request: &CreateLessonPuzzleRequest,
    ) -> Result<LessonPuzzleRecord> {
        let puzzle = request.validate()?;
        let record = self.store.insert_lesson_puzzle(&puzzle).await?;

        info!(
            lesson_id = record.id,
            lesson_index = record.lesson_index,
            "Lesson puzzle created"
        );
        Ok(record)
    }

    /// Delete a lesson puzzle and close the gap it leaves in its chapter.
    #[instrument(skip(self))]
    pub async fn delete_lesson_puzzle(&self, lesson_id: i64) -> Result<LessonPuzzleRecord> {
        let removed = self
            .store
            .delete_lesson_puzzle(lesson_id)
            .await?
            .ok_or(CoreError::LessonPuzzleNotFound { lesson_id })?;

        info!(
            chapter = removed.chapter,
            lesson_index = removed.lesson_index,
            "Lesson puzzle deleted"
        );
        Ok(removed)
    }

    /// Get a single lesson puzzle.
    pub async fn get_lesson_puzzle(&self, lesson_id: i64) -> Result<LessonPuzzleRecord> {
        self.store
            .get_lesson_puzzle(lesson_id)
            .await?
            .ok_or(CoreError::LessonPuzzleNotFound { lesson_id })
    }

    /// One page of a chapter in index order, flagged with the user's progress.
    #[instrument(skip(self))]
    pub async fn list_lesson_puzzles(
        &self,
        chapter: i32,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<LessonPuzzleSummary>> {
        let puzzles = self
            .store
            .list_lesson_puzzles(chapter, user_id, page)
            .await?;
        debug!(count = puzzles.len(), "Listed lesson puzzles");
        Ok(puzzles)
    }

    /// Record that `user_id` solved the puzzle. Returns false when it was
    /// already recorded.
    #[instrument(skip(self))]
    pub async fn solve_lesson_puzzle(&self, lesson_id: i64, user_id: i64) -> Result<bool> {
        if self.store.get_lesson_puzzle(lesson_id).await?.is_none() {
            return Err(CoreError::LessonPuzzleNotFound { lesson_id });
        }
        self.store.mark_lesson_solved(user_id, lesson_id).await
    }

    /// Solved and total counts for a chapter.
    pub async fn lesson_progress(&self, chapter: i32, user_id: i64) -> Result<LessonProgress> {
        self.store.lesson_progress(chapter, user_id).await
    }
}
