//! Database module - optional PostgreSQL persistence
//!
//! The engine is authoritative in memory. When a database is configured,
//! handlers write through after each successful mutation and the engine is
//! hydrated from these tables on startup.

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::engine::{AccessRecord, WhitelistEntry};
use crate::models::{AccessRecordRow, WhitelistEntryRow};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Load everything needed to hydrate the engine
pub async fn load_snapshot(pool: &PgPool) -> Result<(Vec<AccessRecord>, Vec<WhitelistEntry>), sqlx::Error> {
    let records = AccessRecordRow::list_all(pool)
        .await?
        .into_iter()
        .map(AccessRecord::from)
        .collect();

    let entries = WhitelistEntryRow::list_all(pool)
        .await?
        .into_iter()
        .map(WhitelistEntry::from)
        .collect();

    Ok((records, entries))
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Access ledger (one row per observed address)
CREATE TABLE IF NOT EXISTS access_records (
    address VARCHAR(64) PRIMARY KEY,
    first_seen TIMESTAMPTZ NOT NULL,
    last_seen TIMESTAMPTZ NOT NULL,
    access_count BIGINT NOT NULL CHECK (access_count >= 1),
    associated_users JSONB NOT NULL DEFAULT '[]',
    observed_locations JSONB NOT NULL DEFAULT '[]',
    observed_devices JSONB NOT NULL DEFAULT '[]',
    recent_timestamps JSONB NOT NULL DEFAULT '[]'
);

-- Whitelist (allow-list)
CREATE TABLE IF NOT EXISTS whitelist_entries (
    id UUID PRIMARY KEY,
    address VARCHAR(64) NOT NULL UNIQUE,
    admitted_by VARCHAR(128) NOT NULL,
    admitted_at TIMESTAMPTZ NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_access_records_last_seen ON access_records(last_seen);
CREATE INDEX IF NOT EXISTS idx_whitelist_admitted_at ON whitelist_entries(admitted_at);
"#;
