//! Access ledger
//!
//! Folds access events into per-address `AccessRecord`s. Location and
//! timestamp histories are ring buffers of `capacity` entries; the access
//! count keeps growing. The timestamp ring never drops below the
//! rapid-access window, whatever the configured capacity.

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::suspicion::RAPID_WINDOW;
use super::types::{AccessEvent, AccessRecord};

/// Default ring-buffer size for per-address histories
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Timestamps retained per address for a given history capacity
pub fn timestamp_capacity(capacity: usize) -> usize {
    capacity.max(RAPID_WINDOW)
}

// ============================================================================
// RECORD FOLDING
// ============================================================================

impl AccessRecord {
    /// First observation of an address
    pub fn first(event: &AccessEvent, capacity: usize) -> Self {
        let mut record = Self {
            address: event.address.clone(),
            first_seen: event.timestamp,
            last_seen: event.timestamp,
            access_count: 0,
            associated_users: BTreeSet::new(),
            observed_locations: VecDeque::new(),
            observed_devices: BTreeSet::new(),
            recent_timestamps: VecDeque::new(),
        };
        record.observe(event, capacity);
        record
    }

    /// Fold one more event into the record
    pub fn observe(&mut self, event: &AccessEvent, capacity: usize) {
        self.access_count += 1;
        self.last_seen = event.timestamp;

        if let Some(location) = non_empty(event.location.as_deref()) {
            push_bounded(&mut self.observed_locations, location.to_string(), capacity);
        }
        if let Some(device) = non_empty(event.device.as_deref()) {
            self.observed_devices.insert(device.to_string());
        }
        if let Some(user) = non_empty(Some(event.user_id.as_str())) {
            self.associated_users.insert(user.to_string());
        }

        push_bounded(&mut self.recent_timestamps, event.timestamp, timestamp_capacity(capacity));
    }

    /// Number of distinct labels in the retained location history
    pub fn distinct_locations(&self) -> usize {
        self.observed_locations.iter().collect::<BTreeSet<_>>().len()
    }

    pub fn last_location(&self) -> Option<&str> {
        self.observed_locations.back().map(String::as_str)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, capacity: usize) {
    buf.push_back(value);
    while buf.len() > capacity.max(1) {
        buf.pop_front();
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// All tracked addresses, keyed by address literal
#[derive(Debug)]
pub struct Ledger {
    records: HashMap<String, AccessRecord>,
    capacity: usize,
}

impl Ledger {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Create or update the record for `event.address`
    pub fn fold(&mut self, event: &AccessEvent) -> &AccessRecord {
        let capacity = self.capacity;
        self.records
            .entry(event.address.clone())
            .and_modify(|record| record.observe(event, capacity))
            .or_insert_with(|| AccessRecord::first(event, capacity))
    }

    pub fn get(&self, address: &str) -> Option<&AccessRecord> {
        self.records.get(address)
    }

    pub fn records(&self) -> impl Iterator<Item = &AccessRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Replace a record wholesale (used when hydrating from storage)
    pub fn insert(&mut self, mut record: AccessRecord) {
        while record.observed_locations.len() > self.capacity {
            record.observed_locations.pop_front();
        }
        while record.recent_timestamps.len() > timestamp_capacity(self.capacity) {
            record.recent_timestamps.pop_front();
        }
        self.records.insert(record.address.clone(), record);
    }
}

// ============================================================================
// TESTS
// ============================================================================
