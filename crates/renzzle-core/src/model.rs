// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain enums and paging parameters shared by the services and the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Error returned when a string names no variant of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Report the failure as a validation error on `field`.
    pub fn for_field(self, field: &str) -> CoreError {
        CoreError::validation(field, self.to_string())
    }
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Stored and serialized form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum! {
    /// Puzzle difficulty.
    Difficulty, "difficulty" {
        /// Entry level.
        Low => "LOW",
        /// Intermediate.
        Middle => "MIDDLE",
        /// Hard.
        High => "HIGH",
    }
}

text_enum! {
    /// The colour that wins when the puzzle is solved.
    WinColor, "win color" {
        /// Black to play and win.
        Black => "BLACK",
        /// White to play and win.
        White => "WHITE",
    }
}

text_enum! {
    /// Self-declared player level.
    UserLevel, "user level" {
        /// New player.
        Beginner => "BEGINNER",
        /// Knows the basics.
        Intermediate => "INTERMEDIATE",
        /// Strong player.
        Advanced => "ADVANCED",
    }
}

/// Keyset page over a relation ordered by id descending.
///
/// `before_id` is the last id the caller has seen; the next page holds ids
/// strictly below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Exclusive upper bound, `None` for the first page.
    pub before_id: Option<i64>,
    /// Number of rows to return.
    pub size: i64,
}

impl Cursor {
    /// Validate raw query parameters.
    pub fn new(before_id: Option<i64>, size: Option<i64>) -> Result<Self> {
        Ok(Self {
            before_id,
            size: page_size(size)?,
        })
    }

    /// Upper bound usable directly in `id < ?`.
    pub fn upper_bound(&self) -> i64 {
        self.before_id.unwrap_or(i64::MAX)
    }
}

/// Offset page over a chapter ordered by lesson index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page number.
    pub page: i64,
    /// Number of rows to return.
    pub size: i64,
}

impl Page {
    /// Validate raw query parameters.
    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self> {
        let page = page.unwrap_or(0);
        if page < 0 {
            return Err(CoreError::validation("page", "must not be negative"));
        }
        Ok(Self {
            page,
            size: page_size(size)?,
        })
    }

    /// Row offset of the first entry.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

fn page_size(size: Option<i64>) -> Result<i64> {
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(CoreError::validation(
            "size",
            format!("must be between 1 and {}", MAX_PAGE_SIZE),
        ));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parse_is_case_insensitive() {
        assert_eq!("low".parse::<Difficulty>().unwrap(), Difficulty::Low);
        assert_eq!(" Middle ".parse::<Difficulty>().unwrap(), Difficulty::Middle);
        assert_eq!("WHITE".parse::<WinColor>().unwrap(), WinColor::White);
        assert_eq!(
            "advanced".parse::<UserLevel>().unwrap(),
            UserLevel::Advanced
        );
    }

    #[test]
    fn test_enum_parse_unknown() {
        let err = "red".parse::<WinColor>().unwrap_err();
        assert_eq!(err.to_string(), "unknown win color 'red'");
    }

    #[test]
    fn test_enum_parse_error_for_field() {
        let err = "red".parse::<WinColor>().unwrap_err().for_field("winColor");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Validation failed: 'winColor' unknown win color 'red'");
    }

    #[test]
    fn test_enum_serde_form() {
        assert_eq!(
            serde_json::to_string(&Difficulty::High).unwrap(),
            "\"HIGH\""
        );
        let level: UserLevel = serde_json::from_str("\"INTERMEDIATE\"").unwrap();
        assert_eq!(level, UserLevel::Intermediate);
        assert_eq!(WinColor::Black.to_string(), "BLACK");
    }

    #[test]
    fn test_cursor_defaults_and_bounds() {
        let c = Cursor::new(None, None).unwrap();
        assert_eq!(c.size, DEFAULT_PAGE_SIZE);
        assert_eq!(c.upper_bound(), i64::MAX);

        let c = Cursor::new(Some(15), Some(3)).unwrap();
        assert_eq!(c.upper_bound(), 15);

        assert!(Cursor::new(None, Some(0)).is_err());
        assert!(Cursor::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_page_offset() {
        let p = Page::new(Some(2), Some(10)).unwrap();
        assert_eq!(p.offset(), 20);
        assert!(Page::new(Some(-1), None).is_err());
    }
}
