//! Access Policy Module
//!
//! IP admission and access anomaly tracking. The whitelist is the only
//! thing that grants access; the ledger and suspicion findings are
//! reporting signals for operators.
//!
//! ## Structure
//! - `address`: IPv4 / CIDR parsing and containment
//! - `types`: AccessRecord, WhitelistEntry, SuspicionFinding, stats types
//! - `ledger`: per-address history folding
//! - `whitelist`: default-deny allow-list
//! - `suspicion`: location-diversity and rapid-access checks
//! - `stats`: windowed aggregation
//! - `policy`: `AccessPolicyEngine`, the lock-guarded public API
//!
//! ## Usage
//! ```ignore
//! let engine = AccessPolicyEngine::default();
//! engine.admit("10.0.0.0/24", "admin", Utc::now())?;
//! engine.record_access(event)?;
//! if !engine.is_admitted("10.0.0.5") {
//!     reject();
//! }
//! ```

pub mod address;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod stats;
pub mod suspicion;
pub mod types;
pub mod whitelist;

pub use error::PolicyError;
pub use policy::AccessPolicyEngine;
pub use types::{
    AccessEvent,
    AccessRecord,
    AccessStats,
    StatsWindow,
    SuspicionFinding,
    SuspicionParams,
    WhitelistEntry,
};
