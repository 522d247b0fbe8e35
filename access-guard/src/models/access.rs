//! Access ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use validator::Validate;

use crate::engine::suspicion::RAPID_WINDOW;
use crate::engine::{AccessEvent, AccessRecord, SuspicionParams};
use crate::{AppError, AppResult};

/// Inbound access event from the gating layer
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAccessRequest {
    #[validate(length(min = 1, max = 64))]
    pub address: String,
    #[validate(length(max = 128))]
    pub user_id: String,
    #[validate(length(max = 128))]
    pub device: Option<String>,
    #[validate(length(max = 128))]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<RecordAccessRequest> for AccessEvent {
    fn from(req: RecordAccessRequest) -> Self {
        AccessEvent {
            address: req.address,
            user_id: req.user_id,
            device: req.device,
            location: req.location,
            timestamp: req.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdmissionQuery {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct AdmissionResponse {
    pub address: String,
    pub admitted: bool,
}

/// Per-request overrides for suspicion thresholds
#[derive(Debug, Default, Deserialize)]
pub struct SuspicionQuery {
    pub window_seconds: Option<i64>,
    pub location_threshold: Option<usize>,
    pub rapid_count: Option<usize>,
}

impl SuspicionQuery {
    /// Merge overrides onto `defaults`. A `rapid_count` the rapid-access
    /// window cannot hold is rejected instead of silently never firing.
    pub fn apply(&self, defaults: SuspicionParams) -> AppResult<SuspicionParams> {
        if let Some(count) = self.rapid_count {
            if count == 0 || count > RAPID_WINDOW {
                return Err(AppError::ValidationError(format!(
                    "rapid_count must be between 1 and {}",
                    RAPID_WINDOW
                )));
            }
        }

        Ok(SuspicionParams {
            recent_window_seconds: self.window_seconds.unwrap_or(defaults.recent_window_seconds),
            location_threshold: self.location_threshold.unwrap_or(defaults.location_threshold),
            rapid_count_threshold: self.rapid_count.unwrap_or(defaults.rapid_count_threshold),
        })
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// `access_records` row
#[derive(Debug, Clone, FromRow)]
pub struct AccessRecordRow {
    pub address: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub access_count: i64,
    pub associated_users: Json<Vec<String>>,
    pub observed_locations: Json<Vec<String>>,
    pub observed_devices: Json<Vec<String>>,
    pub recent_timestamps: Json<Vec<DateTime<Utc>>>,
}

impl From<AccessRecordRow> for AccessRecord {
    fn from(row: AccessRecordRow) -> Self {
        AccessRecord {
            address: row.address,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            access_count: row.access_count.max(1) as u64,
            associated_users: row.associated_users.0.into_iter().collect(),
            observed_locations: row.observed_locations.0.into_iter().collect(),
            observed_devices: row.observed_devices.0.into_iter().collect(),
            recent_timestamps: row.recent_timestamps.0.into_iter().collect(),
        }
    }
}

impl AccessRecordRow {
    /// Write-through upsert. A concurrent, older snapshot never overwrites a newer one.
    pub async fn upsert(pool: &PgPool, record: &AccessRecord) -> Result<(), sqlx::Error> {
        let users: Vec<&String> = record.associated_users.iter().collect();
        let locations: Vec<&String> = record.observed_locations.iter().collect();
        let devices: Vec<&String> = record.observed_devices.iter().collect();
        let timestamps: Vec<&DateTime<Utc>> = record.recent_timestamps.iter().collect();

        sqlx::query(
            r#"
            INSERT INTO access_records (address, first_seen, last_seen, access_count,
                associated_users, observed_locations, observed_devices, recent_timestamps)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (address) DO UPDATE SET
                last_seen = EXCLUDED.last_seen,
                access_count = EXCLUDED.access_count,
                associated_users = EXCLUDED.associated_users,
                observed_locations = EXCLUDED.observed_locations,
                observed_devices = EXCLUDED.observed_devices,
                recent_timestamps = EXCLUDED.recent_timestamps
            WHERE access_records.access_count <= EXCLUDED.access_count
            "#
        )
        .bind(&record.address)
        .bind(record.first_seen)
        .bind(record.last_seen)
        .bind(record.access_count as i64)
        .bind(Json(users))
        .bind(Json(locations))
        .bind(Json(devices))
        .bind(Json(timestamps))
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM access_records ORDER BY first_seen")
            .fetch_all(pool)
            .await
    }
}
