// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lesson index allocation.
//!
//! Every chapter keeps its lesson puzzles in a dense zero-based sequence.
//! Placement is decided from the chapter's current top index, read inside the
//! same store transaction that applies the shift and the insert, so the store
//! must hold the chapter lock while calling [`IndexPlacement::resolve`].

use crate::error::{CoreError, Result};

/// `top_index` of a chapter with no puzzles.
pub const EMPTY_CHAPTER_TOP: i32 = -1;

/// Where a new lesson puzzle goes and what has to move to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPlacement {
    /// Index assigned to the new puzzle.
    pub index: i32,
    /// When set, every puzzle at or above this index moves up by one first.
    pub shift_from: Option<i32>,
}

impl IndexPlacement {
    /// Decide the placement for a chapter whose highest index is `top`
    /// ([`EMPTY_CHAPTER_TOP`] when empty).
    ///
    /// Without a requested index the puzzle is appended. A requested index may
    /// be anything from `0` up to the append position; anything beyond would
    /// leave a hole in the sequence.
    pub fn resolve(top: i32, requested: Option<i32>) -> Result<Self> {
        let next = top + 1;
        match requested {
            None => Ok(Self {
                index: next,
                shift_from: None,
            }),
            Some(k) if k < 0 => Err(CoreError::validation(
                "puzzleIndex",
                "must not be negative",
            )),
            Some(k) if k > next => Err(CoreError::validation(
                "puzzleIndex",
                format!("must be at most {}", next),
            )),
            Some(k) if k == next => Ok(Self {
                index: k,
                shift_from: None,
            }),
            Some(k) => Ok(Self {
                index: k,
                shift_from: Some(k),
            }),
        }
    }
}
