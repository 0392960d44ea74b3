// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renzzle Server binary
//!
//! Connects to PostgreSQL or SQLite depending on `RENZZLE_DATABASE_URL`,
//! applies migrations and serves the HTTP API until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use renzzle_core::Store;
use renzzle_core::migrations;
use renzzle_core::persistence::{PostgresStore, SqliteStore};
use renzzle_server::config::{Config, DatabaseKind};
use renzzle_server::{AppState, build_router};

async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database_kind {
        DatabaseKind::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;
            info!("Database connection established");

            info!("Running database migrations...");
            migrations::run_postgres(&pool).await?;
            info!("Migrations completed");

            Ok(Arc::new(PostgresStore::new(pool)))
        }
        DatabaseKind::Sqlite => {
            let store = SqliteStore::connect(&config.database_url, config.max_connections).await?;
            info!("SQLite database opened and migrated");
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renzzle_server=info,renzzle_core=info,tower_http=info".into()),
        )
        .init();

    info!("Starting Renzzle Server");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        backend = ?config.database_kind,
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    let store = open_store(&config).await?;
    if !store.health_check().await? {
        anyhow::bail!("database health check failed");
    }

    let app = build_router(Arc::new(AppState::new(store)));
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
