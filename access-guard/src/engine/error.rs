//! Engine errors

use thiserror::Error;

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors raised by the access policy engine.
///
/// Revoking an unknown entry is not an error; `revoke` returns `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Empty or unparseable address passed to `record_access`
    #[error("invalid address: '{0}'")]
    InvalidAddress(String),

    /// Address or CIDR passed to `admit` is not valid IPv4 notation
    #[error("invalid IPv4 address or CIDR block: '{0}'")]
    InvalidAddressFormat(String),

    /// Exact literal already on the whitelist
    #[error("'{0}' is already whitelisted")]
    DuplicateEntry(String),
}
