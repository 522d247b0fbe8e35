//! Ledger aggregation for the admin reporting views

use std::collections::{BTreeSet, HashMap};

use super::types::{AccessRecord, AccessStats, LabelCount, RecentAccess, StatsWindow};

const TOP_N: usize = 10;

/// Aggregate every record whose `last_seen` falls inside `window`
pub fn aggregate<'a, I>(records: I, window: &StatsWindow) -> AccessStats
where
    I: IntoIterator<Item = &'a AccessRecord>,
{
    let mut in_window: Vec<&AccessRecord> = records
        .into_iter()
        .filter(|r| window.contains(r.last_seen))
        .collect();

    // tie-break order for the top lists
    in_window.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.address.cmp(&b.address)));

    let mut users = BTreeSet::new();
    let mut locations = OrderedCounter::default();
    let mut devices = OrderedCounter::default();
    let mut total_accesses = 0u64;

    for record in in_window.iter().copied() {
        total_accesses += record.access_count;
        users.extend(record.associated_users.iter().map(String::as_str));
        for location in &record.observed_locations {
            locations.add(location);
        }
        for device in &record.observed_devices {
            devices.add(device);
        }
    }

    let mut recent: Vec<&AccessRecord> = in_window.clone();
    recent.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.address.cmp(&b.address)));
    let recent_accesses = recent
        .into_iter()
        .take(TOP_N)
        .map(|r| RecentAccess {
            address: r.address.clone(),
            last_seen: r.last_seen,
            access_count: r.access_count,
            last_location: r.last_location().map(str::to_string),
        })
        .collect();

    AccessStats {
        total_accesses,
        unique_addresses: in_window.len(),
        unique_users: users.len(),
        top_locations: locations.top(TOP_N),
        top_devices: devices.top(TOP_N),
        recent_accesses,
    }
}

/// Counter that remembers first-insertion order for stable tie-breaking
#[derive(Default)]
struct OrderedCounter<'a> {
    index: HashMap<&'a str, usize>,
    counts: Vec<(&'a str, u64)>,
}

impl<'a> OrderedCounter<'a> {
    fn add(&mut self, label: &'a str) {
        match self.index.get(label) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(label, self.counts.len());
                self.counts.push((label, 1));
            }
        }
    }

    fn top(mut self, n: usize) -> Vec<LabelCount> {
        // stable sort keeps first-seen order among equal counts
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts
            .into_iter()
            .take(n)
            .map(|(label, count)| LabelCount { label: label.to_string(), count })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ledger::Ledger;
    use crate::engine::types::AccessEvent;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn fold(ledger: &mut Ledger, addr: &str, user: &str, loc: &str, device: &str, mins: i64) {
        ledger.fold(&AccessEvent {
            address: addr.to_string(),
            user_id: user.to_string(),
            device: Some(device.to_string()),
            location: Some(loc.to_string()),
            timestamp: base() + Duration::minutes(mins),
        });
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new(10);
        let stats = aggregate(ledger.records(), &StatsWindow::all_time());
        assert_eq!(stats, AccessStats::default());
    }

    #[test]
    fn test_totals_and_top_lists() {
        let mut ledger = Ledger::new(10);
        fold(&mut ledger, "10.0.0.1", "alice", "Control Room", "desktop", 0);
        fold(&mut ledger, "10.0.0.1", "alice", "Control Room", "desktop", 1);
        fold(&mut ledger, "10.0.0.2", "bob", "Sorting Line 2", "tablet", 2);
        fold(&mut ledger, "10.0.0.3", "alice", "Sorting Line 2", "tablet", 3);
        fold(&mut ledger, "10.0.0.3", "carol", "Warehouse", "phone", 4);

        let stats = aggregate(ledger.records(), &StatsWindow::all_time());
        assert_eq!(stats.total_accesses, 5);
        assert_eq!(stats.unique_addresses, 3);
        assert_eq!(stats.unique_users, 3);

        let locations: Vec<_> = stats.top_locations.iter().map(|c| (c.label.as_str(), c.count)).collect();
        assert_eq!(locations, vec![("Control Room", 2), ("Sorting Line 2", 2), ("Warehouse", 1)]);

        let devices: Vec<_> = stats.top_devices.iter().map(|c| (c.label.as_str(), c.count)).collect();
        assert_eq!(devices, vec![("tablet", 2), ("desktop", 1), ("phone", 1)]);

        assert_eq!(stats.recent_accesses[0].address, "10.0.0.3");
        assert_eq!(stats.recent_accesses[0].last_location.as_deref(), Some("Warehouse"));
    }

    #[test]
    fn test_window_filters_on_last_seen() {
        let mut ledger = Ledger::new(10);
        fold(&mut ledger, "10.0.0.1", "alice", "A", "d", 0);
        fold(&mut ledger, "10.0.0.2", "bob", "B", "d", 30);
        fold(&mut ledger, "10.0.0.3", "carol", "C", "d", 60);

        let window = StatsWindow {
            since: Some(base() + Duration::minutes(10)),
            until: Some(base() + Duration::minutes(60)),
        };
        let stats = aggregate(ledger.records(), &window);
        assert_eq!(stats.unique_addresses, 2);
        assert_eq!(stats.total_accesses, 2);
    }

    #[test]
    fn test_top_lists_truncated() {
        let mut ledger = Ledger::new(50);
        for i in 0..15 {
            fold(&mut ledger, &format!("10.0.1.{i}"), "u", &format!("Bay {i}"), &format!("dev-{i}"), i);
        }

        let stats = aggregate(ledger.records(), &StatsWindow::all_time());
        assert_eq!(stats.top_locations.len(), 10);
        assert_eq!(stats.top_devices.len(), 10);
        assert_eq!(stats.recent_accesses.len(), 10);
        assert_eq!(stats.top_locations[0].label, "Bay 0");
        assert_eq!(stats.recent_accesses[0].address, "10.0.1.14");
    }
}
