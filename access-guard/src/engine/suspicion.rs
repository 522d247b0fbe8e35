//! Suspicion evaluator
//!
//! Two independent heuristics over an address's retained history:
//! location diversity and rapid repeated access. Findings are advisory;
//! admission is decided by the whitelist alone.

use super::types::{AccessRecord, SuspicionFinding, SuspicionParams};

pub const RAPID_ACCESS_REASON: &str = "Rapid access attempts within short time frame";

/// Number of most-recent timestamps the rapid-access check looks at.
/// A `rapid_count_threshold` above this can never fire.
pub const RAPID_WINDOW: usize = 5;

/// Evaluate one record. `None` means the address was never seen.
pub fn evaluate(address: &str, record: Option<&AccessRecord>, params: &SuspicionParams) -> SuspicionFinding {
    let mut reasons = Vec::new();

    if let Some(record) = record {
        if let Some(reason) = check_location_diversity(record, params.location_threshold) {
            reasons.push(reason);
        }
        if let Some(reason) =
            check_rapid_access(record, params.rapid_count_threshold, params.recent_window_seconds)
        {
            reasons.push(reason);
        }
    }

    SuspicionFinding {
        address: address.to_string(),
        suspicious: !reasons.is_empty(),
        reasons,
    }
}

fn check_location_diversity(record: &AccessRecord, threshold: usize) -> Option<String> {
    let distinct = record.distinct_locations();
    (distinct > threshold).then(|| format!("Multiple locations ({}) from same IP", distinct))
}

fn check_rapid_access(record: &AccessRecord, count_threshold: usize, window_secs: i64) -> Option<String> {
    let history = &record.recent_timestamps;
    let window = history.range(history.len().saturating_sub(RAPID_WINDOW)..);
    if window.len() < count_threshold.max(1) {
        return None;
    }

    // events may arrive out of order, so take min/max rather than ends
    let oldest = window.clone().min()?;
    let newest = window.max()?;
    let span = *newest - *oldest;

    (span.num_milliseconds() < window_secs.saturating_mul(1000)).then(|| RAPID_ACCESS_REASON.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
