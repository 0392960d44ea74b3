// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renju board parsing and canonical board keys.
//!
//! A board status is the move sequence that produced a position, written as
//! renju coordinates: a column letter `a`..`o` followed by a row number
//! `1`..`15` (`h8i9h9`). Moves alternate colours starting with black.
//!
//! [`make_board_key`] reduces a position to a key that ignores the order in
//! which each colour's stones were played and the eight symmetries of the
//! board, so the same puzzle entered twice (or mirrored) maps to one key.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Board edge length.
pub const BOARD_SIZE: u8 = 15;

/// Errors produced while parsing a board status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The status holds no moves.
    #[error("board status is empty")]
    Empty,
    /// A column letter outside `a`..`o` (or not a letter at all).
    #[error("invalid column '{found}' at position {position}")]
    InvalidColumn {
        /// Byte offset of the offending character.
        position: usize,
        /// The character found.
        found: char,
    },
    /// A missing or out of range row number.
    #[error("invalid row at position {position}")]
    InvalidRow {
        /// Byte offset where the row was expected.
        position: usize,
    },
    /// The same point appears twice.
    #[error("point {point} is played more than once")]
    DuplicatePoint {
        /// The repeated point in renju notation.
        point: String,
    },
}

impl From<BoardError> for crate::error::CoreError {
    fn from(err: BoardError) -> Self {
        crate::error::CoreError::validation("boardStatus", err.to_string())
    }
}

/// Stone colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stone {
    /// Moves 1, 3, 5, ...
    Black,
    /// Moves 2, 4, 6, ...
    White,
}

/// A board intersection, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    /// Column, `0` is `a`.
    pub x: u8,
    /// Row, `0` is `1`.
    pub y: u8,
}

impl Point {
    fn transform(self, symmetry: u8) -> Point {
        let m = BOARD_SIZE - 1;
        let (x, y) = (self.x, self.y);
        let (x, y) = match symmetry {
            0 => (x, y),
            1 => (y, m - x),
            2 => (m - x, m - y),
            3 => (m - y, x),
            4 => (m - x, y),
            5 => (x, m - y),
            6 => (y, x),
            _ => (m - y, m - x),
        };
        Point { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.x) as char, self.y + 1)
    }
}

/// A parsed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    moves: Vec<Point>,
}

impl Board {
    /// Parse a board status string.
    pub fn parse(status: &str) -> Result<Self, BoardError> {
        let bytes = status.trim().as_bytes();
        if bytes.is_empty() {
            return Err(BoardError::Empty);
        }

        let mut moves = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let c = bytes[pos].to_ascii_lowercase();
            if !(b'a'..b'a' + BOARD_SIZE).contains(&c) {
                return Err(BoardError::InvalidColumn {
                    position: pos,
                    found: bytes[pos] as char,
                });
            }
            pos += 1;

            let row_start = pos;
            while pos < bytes.len() && pos - row_start < 2 && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let row: u8 = std::str::from_utf8(&bytes[row_start..pos])
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|r| (1..=BOARD_SIZE).contains(r))
                .ok_or(BoardError::InvalidRow {
                    position: row_start,
                })?;

            let point = Point {
                x: c - b'a',
                y: row - 1,
            };
            if moves.contains(&point) {
                return Err(BoardError::DuplicatePoint {
                    point: point.to_string(),
                });
            }
            moves.push(point);
        }

        Ok(Self { moves })
    }

    /// Moves in play order.
    pub fn moves(&self) -> &[Point] {
        &self.moves
    }

    /// Iterate stones with their colour.
    pub fn stones(&self) -> impl Iterator<Item = (Point, Stone)> + '_ {
        self.moves.iter().enumerate().map(|(i, p)| {
            let stone = if i % 2 == 0 { Stone::Black } else { Stone::White };
            (*p, stone)
        })
    }

    fn listing(&self, symmetry: u8) -> String {
        let mut black = Vec::new();
        let mut white = Vec::new();
        for (point, stone) in self.stones() {
            let p = point.transform(symmetry);
            match stone {
                Stone::Black => black.push(p),
                Stone::White => white.push(p),
            }
        }
        black.sort_unstable();
        white.sort_unstable();

        let mut out = String::from("b:");
        for p in &black {
            let _ = write!(out, "{p}");
        }
        out.push_str("|w:");
        for p in &white {
            let _ = write!(out, "{p}");
        }
        out
    }

    /// Canonical textual form: the smallest stone listing over all symmetries.
    pub fn canonical_form(&self) -> String {
        (0..8)
            .map(|s| self.listing(s))
            .min()
            .unwrap_or_default()
    }
}

/// Writes the moves back in play order, lowercase and without padding.
impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for p in &self.moves {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

/// Derive the board key of a parsed position (hex SHA-256 of its canonical form).
pub fn make_board_key(board: &Board) -> String {
    let digest = Sha256::digest(board.canonical_form().as_bytes());
    format!("{:x}", digest)
}

/// Parse a board status and derive its key.
pub fn board_key(status: &str) -> Result<String, BoardError> {
    Board::parse(status).map(|b| make_board_key(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_sequence() {
        let board = Board::parse("h8i9h10").unwrap();
        assert_eq!(
            board.moves(),
            &[
                Point { x: 7, y: 7 },
                Point { x: 8, y: 8 },
                Point { x: 7, y: 9 }
            ]
        );
        let colours: Vec<Stone> = board.stones().map(|(_, s)| s).collect();
        assert_eq!(colours, vec![Stone::Black, Stone::White, Stone::Black]);
    }

    #[test]
    fn test_parse_accepts_uppercase_and_whitespace() {
        assert_eq!(Board::parse(" H8I9 ").unwrap(), Board::parse("h8i9").unwrap());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Board::parse(""), Err(BoardError::Empty));
        assert_eq!(Board::parse("   "), Err(BoardError::Empty));
        assert!(matches!(
            Board::parse("p1"),
            Err(BoardError::InvalidColumn { position: 0, found: 'p' })
        ));
        assert!(matches!(
            Board::parse("a16"),
            Err(BoardError::InvalidRow { position: 1 })
        ));
        assert!(matches!(
            Board::parse("a0"),
            Err(BoardError::InvalidRow { .. })
        ));
        assert!(matches!(Board::parse("h"), Err(BoardError::InvalidRow { .. })));
        assert!(matches!(
            Board::parse("h8h8"),
            Err(BoardError::DuplicatePoint { .. })
        ));
        assert!(matches!(
            Board::parse("h8-"),
            Err(BoardError::InvalidColumn { found: '-', .. })
        ));
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = board_key("h8i9j10k7").unwrap();
        let b = board_key("h8i9j10k7").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_move_order_within_colour() {
        // Black: h8, j10. White: i9, k7. Same stones, different order.
        let a = board_key("h8i9j10k7").unwrap();
        let b = board_key("j10k7h8i9").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_symmetry() {
        let original = Board::parse("a1b2c1").unwrap();
        for s in 1..8 {
            let moved: String = original
                .moves()
                .iter()
                .map(|p| p.transform(s).to_string())
                .collect();
            assert_eq!(
                board_key(&moved).unwrap(),
                make_board_key(&original),
                "symmetry {} should share a key",
                s
            );
        }
    }

    #[test]
    fn test_key_depends_on_colour() {
        // h8 is the centre point, fixed under every symmetry.
        assert_ne!(board_key("h8i9").unwrap(), board_key("i9h8").unwrap());
    }

    #[test]
    fn test_key_differs_for_different_positions() {
        assert_ne!(board_key("h8i9").unwrap(), board_key("h8i10").unwrap());
    }

    #[test]
    fn test_board_error_becomes_validation_failure() {
        let err: crate::error::CoreError = Board::parse("z9").unwrap_err().into();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("'boardStatus' invalid column 'z'"));
    }

    #[test]
    fn test_display_normalises_spelling() {
        let board = Board::parse(" H08i09O15 ").unwrap();
        assert_eq!(board.to_string(), "h8i9o15");
        assert_eq!(Board::parse(&board.to_string()).unwrap(), board);
    }

    #[test]
    fn test_point_display() {
        assert_eq!(Point { x: 0, y: 0 }.to_string(), "a1");
        assert_eq!(Point { x: 14, y: 14 }.to_string(), "o15");
    }
}
