// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Field rules shared by lesson and community puzzles.

use crate::board::{Board, make_board_key};
use crate::error::FieldErrors;
use crate::model::{Difficulty, WinColor};

/// Longest accepted title, in characters.
pub const TITLE_MAX_LEN: usize = 100;

/// Longest accepted description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Puzzle fields after validation, with the board key derived.
#[derive(Debug, Clone)]
pub(crate) struct PuzzleBody {
    pub title: String,
    pub board_status: String,
    pub board_key: String,
    pub depth: i32,
    pub description: String,
    pub difficulty: Difficulty,
    pub win_color: WinColor,
}

/// Raw puzzle fields as they arrive in a request.
pub(crate) struct RawPuzzle<'a> {
    pub title: &'a str,
    pub board_status: &'a str,
    pub depth: i32,
    pub description: &'a str,
    pub difficulty: &'a str,
    pub win_color: &'a str,
}

impl RawPuzzle<'_> {
    /// Check every field, recording failures in `errors`. Returns the
    /// validated body only when all fields passed.
    pub fn check(&self, errors: &mut FieldErrors) -> Option<PuzzleBody> {
        let title = self.title.trim();
        errors.check(title.is_empty(), "title", "must not be blank");
        if title.chars().count() > TITLE_MAX_LEN {
            errors.push("title", format!("must be at most {} characters", TITLE_MAX_LEN));
        }

        let board = match Board::parse(self.board_status) {
            Ok(board) => Some(board),
            Err(e) => {
                errors.push("boardStatus", e.to_string());
                None
            }
        };

        errors.check(self.depth < 1, "depth", "must be at least 1");

        if self.description.chars().count() > DESCRIPTION_MAX_LEN {
            errors.push(
                "description",
                format!("must be at most {} characters", DESCRIPTION_MAX_LEN),
            );
        }

        let difficulty = self
            .difficulty
            .parse::<Difficulty>()
            .map_err(|e| errors.push("difficulty", e.to_string()))
            .ok();
        let win_color = self
            .win_color
            .parse::<WinColor>()
            .map_err(|e| errors.push("winColor", e.to_string()))
            .ok();

        if !errors.is_empty() {
            return None;
        }

        let board = board?;
        Some(PuzzleBody {
            title: title.to_string(),
            board_status: board.to_string(),
            board_key: make_board_key(&board),
            depth: self.depth,
            description: self.description.to_string(),
            difficulty: difficulty?,
            win_color: win_color?,
        })
    }
}
