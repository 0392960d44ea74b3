// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for renzzle-core.
//!
//! Provides a unified error type with stable error codes that the HTTP layer
//! translates into status codes and response envelopes.

use serde::Serialize;
use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as it appears in the request body.
    pub field: String,
    /// Human readable reason.
    pub message: String,
}

/// Core errors that can occur during request processing.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// User was not found.
    UserNotFound {
        /// The user ID that was not found.
        user_id: i64,
    },

    /// Community puzzle was not found.
    PuzzleNotFound {
        /// The puzzle ID that was not found.
        puzzle_id: i64,
    },

    /// Lesson puzzle was not found.
    LessonPuzzleNotFound {
        /// The lesson puzzle ID that was not found.
        lesson_id: i64,
    },

    /// Diagnostic entity was not found.
    EntityNotFound {
        /// The entity ID that was not found.
        id: i64,
    },

    /// The caller tried to act on a resource owned by someone else.
    PermissionDenied {
        /// The acting user.
        user_id: i64,
        /// Description of the resource.
        resource: String,
    },

    /// One or more request fields failed validation.
    ValidationFailed {
        /// Every rejected field, in the order they were checked.
        errors: Vec<FieldError>,
    },

    /// A concurrent write or a uniqueness rule rejected the operation.
    Conflict {
        /// What collided.
        reason: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Shorthand for a validation failure on a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::PuzzleNotFound { .. } => "PUZZLE_NOT_FOUND",
            Self::LessonPuzzleNotFound { .. } => "LESSON_PUZZLE_NOT_FOUND",
            Self::EntityNotFound { .. } => "ENTITY_NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::ValidationFailed { .. } => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }

    /// Whether the error means the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::PuzzleNotFound { .. }
                | Self::LessonPuzzleNotFound { .. }
                | Self::EntityNotFound { .. }
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { user_id } => write!(f, "User '{}' not found", user_id),
            Self::PuzzleNotFound { puzzle_id } => {
                write!(f, "Puzzle '{}' not found", puzzle_id)
            }
            Self::LessonPuzzleNotFound { lesson_id } => {
                write!(f, "Lesson puzzle '{}' not found", lesson_id)
            }
            Self::EntityNotFound { id } => write!(f, "Entity '{}' not found", id),
            Self::PermissionDenied { user_id, resource } => {
                write!(f, "User '{}' may not modify {}", user_id, resource)
            }
            Self::ValidationFailed { errors } => {
                write!(f, "Validation failed")?;
                for (i, e) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{}'{}' {}", sep, e.field, e.message)?;
                }
                Ok(())
            }
            Self::Conflict { reason } => write!(f, "Conflict: {}", reason),
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // 40001 / 40P01: serialization failure and deadlock on PostgreSQL.
            let retryable = matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"));
            if db_err.is_unique_violation() || retryable {
                return CoreError::Conflict {
                    reason: db_err.message().to_string(),
                };
            }
        }
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CoreError::DatabaseError {
            operation: "migrate".to_string(),
            details: err.to_string(),
        }
    }
}

/// Collects field errors so that a request is rejected once with every problem.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejected field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record a rejected field when `failed` holds.
    pub fn check(&mut self, failed: bool, field: &str, message: &str) {
        if failed {
            self.push(field, message);
        }
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The collected failure, regardless of whether anything was recorded.
    pub fn into_error(self) -> CoreError {
        CoreError::ValidationFailed {
            errors: self.errors,
        }
    }

    /// `Ok(value)` when nothing was recorded, the collected failure otherwise.
    pub fn finish<T>(self, value: T) -> Result<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.into_error())
        }
    }
}
