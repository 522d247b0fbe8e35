//! Access Policy Types
//!
//! Data structures shared by the ledger, whitelist, suspicion evaluator and
//! reporting. No decision logic lives here.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// INPUT
// ============================================================================

/// One observed access attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub address: String,
    pub user_id: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// LEDGER
// ============================================================================

/// Per-address access history, independent of admission status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub address: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Number of events folded into this record, never truncated
    pub access_count: u64,
    pub associated_users: BTreeSet<String>,
    /// Most-recent last, bounded by the ledger's history capacity
    pub observed_locations: VecDeque<String>,
    pub observed_devices: BTreeSet<String>,
    /// Per-access timestamps, most-recent last, bounded like `observed_locations`
    pub recent_timestamps: VecDeque<DateTime<Utc>>,
}

// ============================================================================
// WHITELIST
// ============================================================================

/// Admin-granted admission for an address or CIDR block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: Uuid,
    /// Literal as admitted: `192.168.1.1` or `10.0.0.0/24`
    pub address: String,
    pub admitted_by: String,
    pub admitted_at: DateTime<Utc>,
}

// ============================================================================
// SUSPICION
// ============================================================================

/// Advisory anomaly signal, computed on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspicionFinding {
    pub address: String,
    pub reasons: Vec<String>,
    pub suspicious: bool,
}

/// Thresholds for `evaluate_suspicion`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionParams {
    pub recent_window_seconds: i64,
    pub location_threshold: usize,
    pub rapid_count_threshold: usize,
}

impl Default for SuspicionParams {
    fn default() -> Self {
        Self {
            recent_window_seconds: 60,
            location_threshold: 3,
            rapid_count_threshold: 5,
        }
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Inclusive time bounds on `last_seen`; open on either side when unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StatsWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl StatsWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| ts >= since) && self.until.map_or(true, |until| ts <= until)
    }
}

/// Frequency of one location or device label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

/// Summary row for the most recently active addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAccess {
    pub address: String,
    pub last_seen: DateTime<Utc>,
    pub access_count: u64,
    pub last_location: Option<String>,
}

/// Aggregated ledger report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessStats {
    pub total_accesses: u64,
    pub unique_addresses: usize,
    pub unique_users: usize,
    pub top_locations: Vec<LabelCount>,
    pub top_devices: Vec<LabelCount>,
    pub recent_accesses: Vec<RecentAccess>,
}
