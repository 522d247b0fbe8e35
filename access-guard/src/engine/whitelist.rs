//! Whitelist (allow-list)
//!
//! Default deny. Entries are compared by their literal for duplicates and
//! by parsed pattern for admission, so overlapping blocks can coexist.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::address::{parse_ipv4, AddressPattern};
use super::error::{PolicyError, PolicyResult};
use super::types::WhitelistEntry;

#[derive(Debug, Clone)]
struct Admitted {
    entry: WhitelistEntry,
    pattern: AddressPattern,
}

/// Admitted entries in admission order
#[derive(Debug, Default)]
pub struct Whitelist {
    entries: Vec<Admitted>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new entry for `literal`
    pub fn admit(
        &mut self,
        literal: &str,
        admitted_by: &str,
        now: DateTime<Utc>,
    ) -> PolicyResult<WhitelistEntry> {
        let literal = literal.trim();
        let pattern = AddressPattern::parse(literal)?;

        if self.entries.iter().any(|a| a.entry.address == literal) {
            return Err(PolicyError::DuplicateEntry(literal.to_string()));
        }

        let entry = WhitelistEntry {
            id: Uuid::new_v4(),
            address: literal.to_string(),
            admitted_by: admitted_by.to_string(),
            admitted_at: now,
        };
        self.entries.push(Admitted { entry: entry.clone(), pattern });
        Ok(entry)
    }

    /// Re-insert a persisted entry, keeping its id
    pub fn restore(&mut self, entry: WhitelistEntry) -> PolicyResult<()> {
        let pattern = AddressPattern::parse(entry.address.trim())?;
        if self.entries.iter().any(|a| a.entry.id == entry.id || a.entry.address == entry.address) {
            return Err(PolicyError::DuplicateEntry(entry.address));
        }
        self.entries.push(Admitted { entry, pattern });
        Ok(())
    }

    /// Remove the entry with `id`; `None` when nothing matched
    pub fn revoke(&mut self, id: Uuid) -> Option<WhitelistEntry> {
        let pos = self.entries.iter().position(|a| a.entry.id == id)?;
        Some(self.entries.remove(pos).entry)
    }

    /// Admission check: exact literal or pattern containment
    pub fn covers(&self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            return false;
        }

        let parsed: Option<Ipv4Addr> = parse_ipv4(address);
        self.entries.iter().any(|a| {
            a.entry.address == address || parsed.map_or(false, |ip| a.pattern.contains(ip))
        })
    }

    pub fn entries(&self) -> Vec<WhitelistEntry> {
        self.entries.iter().map(|a| a.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
