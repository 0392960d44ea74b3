// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server self-test operations.
//!
//! The same `{id, name}` entity is written through two paths: typed record
//! mapping (`FromRow`) and raw row access. Comparing both exposes mapping
//! problems separately from connectivity problems.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{CoreError, FieldErrors, Result};
use crate::persistence::{DiagnosticEntity, Store};

/// Longest accepted entity name.
pub const NAME_MAX_LEN: usize = 100;

/// Greeting returned by [`DiagnosticsService::hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelloResponse {
    /// Greeting text.
    pub message: String,
}

/// Body of a save request.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveEntityRequest {
    /// Name to store.
    pub name: String,
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let mut errors = FieldErrors::new();
    errors.check(name.is_empty(), "name", "must not be blank");
    errors.check(
        name.chars().count() > NAME_MAX_LEN,
        "name",
        "must be at most 100 characters",
    );
    errors.finish(name)
}

/// Diagnostic operations.
#[derive(Clone)]
pub struct DiagnosticsService {
    store: Arc<dyn Store>,
}

impl DiagnosticsService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Greet without touching the database.
    pub fn hello(&self, name: &str) -> HelloResponse {
        HelloResponse {
            message: format!("Hello, {}!", name),
        }
    }

    /// Save through the typed path.
    #[instrument(skip(self, request))]
    pub async fn save_entity(&self, request: &SaveEntityRequest) -> Result<DiagnosticEntity> {
        let name = validate_name(&request.name)?;
        self.store.save_diagnostic_entity(name).await
    }

    /// Find through the typed path.
    pub async fn find_entity(&self, id: i64) -> Result<DiagnosticEntity> {
        self.store
            .find_diagnostic_entity(id)
            .await?
            .ok_or(CoreError::EntityNotFound { id })
    }

    /// Save through the raw path.
    #[instrument(skip(self, request))]
    pub async fn save_raw_entity(&self, request: &SaveEntityRequest) -> Result<DiagnosticEntity> {
        let name = validate_name(&request.name)?;
        let id = self.store.save_raw_entity(name).await?;
        Ok(DiagnosticEntity {
            id,
            name: name.to_string(),
        })
    }

    /// Find through the raw path.
    pub async fn find_raw_entity(&self, id: i64) -> Result<DiagnosticEntity> {
        self.store
            .find_raw_entity(id)
            .await?
            .ok_or(CoreError::EntityNotFound { id })
    }

    /// Remove every diagnostic row.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<bool> {
        let removed = self.store.clear_diagnostics().await?;
        info!(removed, "Diagnostic data cleared");
        Ok(true)
    }

    /// Whether the store answers.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SqliteStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> DiagnosticsService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        crate::migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        DiagnosticsService::new(Arc::new(SqliteStore::new(pool)))
    }

    fn save(name: &str) -> SaveEntityRequest {
        SaveEntityRequest {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_hello() {
        let service = service().await;
        assert_eq!(service.hello("renzzle").message, "Hello, renzzle!");
        assert!(service.store_healthy().await);
    }

    #[tokio::test]
    async fn test_typed_and_raw_paths_agree() {
        let service = service().await;

        let typed = service.save_entity(&save(" first ")).await.unwrap();
        assert_eq!(typed.name, "first");
        assert_eq!(service.find_entity(typed.id).await.unwrap(), typed);

        let raw = service.save_raw_entity(&save("second")).await.unwrap();
        assert_eq!(service.find_raw_entity(raw.id).await.unwrap(), raw);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let service = service().await;
        let err = service.save_entity(&save("   ")).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let long = "n".repeat(NAME_MAX_LEN + 1);
        assert!(service.save_raw_entity(&save(&long)).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_removes_both_paths() {
        let service = service().await;
        let typed = service.save_entity(&save("a")).await.unwrap();
        let raw = service.save_raw_entity(&save("b")).await.unwrap();

        assert!(service.clear().await.unwrap());
        assert!(matches!(
            service.find_entity(typed.id).await,
            Err(CoreError::EntityNotFound { .. })
        ));
        assert!(service.find_raw_entity(raw.id).await.is_err());
    }
}
