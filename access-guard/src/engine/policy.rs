//! Access Policy Engine
//!
//! Owns the ledger and the whitelist behind one `RwLock`, so every
//! mutation is atomic from a reader's point of view. Nothing here blocks
//! on I/O; persistence is layered on top by the HTTP handlers.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::error::{PolicyError, PolicyResult};
use super::ledger::{Ledger, DEFAULT_HISTORY_CAPACITY};
use super::stats;
use super::suspicion::{self, RAPID_WINDOW};
use super::types::*;
use super::whitelist::Whitelist;

struct PolicyState {
    ledger: Ledger,
    whitelist: Whitelist,
}

pub struct AccessPolicyEngine {
    state: RwLock<PolicyState>,
    defaults: SuspicionParams,
}

impl Default for AccessPolicyEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, SuspicionParams::default())
    }
}

impl AccessPolicyEngine {
    pub fn new(history_capacity: usize, defaults: SuspicionParams) -> Self {
        if defaults.rapid_count_threshold > RAPID_WINDOW {
            tracing::warn!(
                "Rapid-access threshold {} exceeds the {}-event window; the check will never fire",
                defaults.rapid_count_threshold, RAPID_WINDOW
            );
        }
        Self {
            state: RwLock::new(PolicyState {
                ledger: Ledger::new(history_capacity),
                whitelist: Whitelist::new(),
            }),
            defaults,
        }
    }

    /// Thresholds applied when `evaluate_suspicion` is called without overrides
    pub fn suspicion_defaults(&self) -> SuspicionParams {
        self.defaults
    }

    // ========================================================================
    // LEDGER
    // ========================================================================

    /// Fold one access event into the ledger
    pub fn record_access(&self, mut event: AccessEvent) -> PolicyResult<AccessRecord> {
        event.address = match canonical_address(&event.address) {
            Some(address) => address,
            None => return Err(PolicyError::InvalidAddress(event.address.trim().to_string())),
        };

        let record = self.state.write().ledger.fold(&event).clone();

        tracing::debug!(
            "Access recorded: {} (user={}, count={})",
            record.address, event.user_id, record.access_count
        );
        Ok(record)
    }

    pub fn get_record(&self, address: &str) -> Option<AccessRecord> {
        self.state.read().ledger.get(&lookup_key(address)).cloned()
    }

    /// All records, most recently active first
    pub fn list_records(&self) -> Vec<AccessRecord> {
        let mut records: Vec<AccessRecord> = self.state.read().ledger.records().cloned().collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.address.cmp(&b.address)));
        records
    }

    // ========================================================================
    // WHITELIST
    // ========================================================================

    /// Admission check. History never implies admission.
    pub fn is_admitted(&self, address: &str) -> bool {
        self.state.read().whitelist.covers(address)
    }

    pub fn admit(
        &self,
        address_or_cidr: &str,
        admitted_by: &str,
        now: DateTime<Utc>,
    ) -> PolicyResult<WhitelistEntry> {
        let entry = self.state.write().whitelist.admit(address_or_cidr, admitted_by, now)?;
        tracing::info!("Whitelist entry {} admitted: {} by {}", entry.id, entry.address, entry.admitted_by);
        Ok(entry)
    }

    /// Remove a whitelist entry; `false` when the id is unknown
    pub fn revoke(&self, entry_id: Uuid) -> bool {
        match self.state.write().whitelist.revoke(entry_id) {
            Some(entry) => {
                tracing::info!("Whitelist entry {} revoked: {}", entry.id, entry.address);
                true
            }
            None => {
                tracing::debug!("Revoke of unknown whitelist entry {}", entry_id);
                false
            }
        }
    }

    /// Entries in admission order
    pub fn list_whitelist(&self) -> Vec<WhitelistEntry> {
        self.state.read().whitelist.entries()
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    pub fn evaluate_suspicion(&self, address: &str, params: Option<SuspicionParams>) -> SuspicionFinding {
        let params = params.unwrap_or(self.defaults);
        let address = lookup_key(address);

        let finding = {
            let state = self.state.read();
            suspicion::evaluate(&address, state.ledger.get(&address), &params)
        };

        if finding.suspicious {
            tracing::warn!("Suspicious access pattern for {}: {:?}", address, finding.reasons);
        }
        finding
    }

    pub fn get_stats(&self, window: Option<StatsWindow>) -> AccessStats {
        let window = window.unwrap_or_else(StatsWindow::all_time);
        stats::aggregate(self.state.read().ledger.records(), &window)
    }

    // ========================================================================
    // HYDRATION
    // ========================================================================

    /// Load persisted state. Invalid whitelist rows are skipped with a warning.
    pub fn restore(&self, records: Vec<AccessRecord>, entries: Vec<WhitelistEntry>) {
        let mut state = self.state.write();

        for record in records {
            state.ledger.insert(record);
        }
        for entry in entries {
            if let Err(e) = state.whitelist.restore(entry) {
                tracing::warn!("Skipping persisted whitelist entry: {}", e);
            }
        }

        tracing::info!(
            "Restored {} access records and {} whitelist entries",
            state.ledger.len(),
            state.whitelist.len()
        );
    }
}

/// One ledger key per address: `::1` and `0:0:0:0:0:0:0:1` are the same host
fn canonical_address(address: &str) -> Option<String> {
    address.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

fn lookup_key(address: &str) -> String {
    canonical_address(address).unwrap_or_else(|| address.trim().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
