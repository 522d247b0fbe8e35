//! Whitelist models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::engine::WhitelistEntry;

/// Admin command: admit an address or CIDR block
#[derive(Debug, Deserialize, Validate)]
pub struct AdmitRequest {
    #[validate(length(min = 1, max = 64))]
    pub address_or_cidr: String,
    #[validate(length(min = 1, max = 128))]
    pub admitted_by: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    /// Echo of the requested id, verbatim when it is not a UUID
    pub id: String,
    pub removed: bool,
}

/// `whitelist_entries` row
#[derive(Debug, Clone, FromRow)]
pub struct WhitelistEntryRow {
    pub id: Uuid,
    pub address: String,
    pub admitted_by: String,
    pub admitted_at: DateTime<Utc>,
}

impl From<WhitelistEntryRow> for WhitelistEntry {
    fn from(row: WhitelistEntryRow) -> Self {
        WhitelistEntry {
            id: row.id,
            address: row.address,
            admitted_by: row.admitted_by,
            admitted_at: row.admitted_at,
        }
    }
}

impl WhitelistEntryRow {
    pub async fn insert(pool: &PgPool, entry: &WhitelistEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO whitelist_entries (id, address, admitted_by, admitted_at)
            VALUES ($1, $2, $3, $4)
            "#
        )
        .bind(entry.id)
        .bind(&entry.address)
        .bind(&entry.admitted_by)
        .bind(entry.admitted_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM whitelist_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM whitelist_entries ORDER BY admitted_at")
            .fetch_all(pool)
            .await
    }
}
