//! IPv4 address and CIDR handling for whitelist entries
//!
//! Whitelist literals are either a plain dotted-quad (`192.168.1.1`) or a
//! CIDR block (`10.0.0.0/24`). Parsing is strict: exactly four decimal
//! octets of 1-3 digits each, prefix 0-32.

use std::net::Ipv4Addr;

use super::error::{PolicyError, PolicyResult};

// ============================================================================
// PATTERN
// ============================================================================

/// Parsed form of a whitelist literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPattern {
    /// Single host
    Host(Ipv4Addr),
    /// CIDR block; host bits in `network` are ignored when matching
    Block { network: Ipv4Addr, prefix: u8 },
}

impl AddressPattern {
    /// Parse a whitelist literal (already trimmed)
    pub fn parse(literal: &str) -> PolicyResult<Self> {
        let invalid = || PolicyError::InvalidAddressFormat(literal.to_string());

        match literal.split_once('/') {
            None => parse_ipv4(literal).map(AddressPattern::Host).ok_or_else(invalid),
            Some((addr, prefix)) => {
                let network = parse_ipv4(addr).ok_or_else(invalid)?;
                let prefix = parse_prefix(prefix).ok_or_else(invalid)?;
                Ok(AddressPattern::Block { network, prefix })
            }
        }
    }

    /// Check whether `addr` is covered by this pattern
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        match *self {
            AddressPattern::Host(host) => host == addr,
            AddressPattern::Block { network, prefix } => {
                let mask = prefix_mask(prefix);
                u32::from(network) & mask == u32::from(addr) & mask
            }
        }
    }
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

/// Strict dotted-quad parser
pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');

    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u8>().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(Ipv4Addr::from(octets))
}

fn parse_prefix(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u8>().ok().filter(|p| *p <= 32)
}

fn prefix_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p.min(32))),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host() {
        assert_eq!(
            AddressPattern::parse("192.168.1.1"),
            Ok(AddressPattern::Host(Ipv4Addr::new(192, 168, 1, 1)))
        );
    }

    #[test]
    fn test_parse_block() {
        assert_eq!(
            AddressPattern::parse("10.0.0.0/24"),
            Ok(AddressPattern::Block { network: Ipv4Addr::new(10, 0, 0, 0), prefix: 24 })
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "not-an-ip", "", "1.2.3", "1.2.3.4.5", "256.1.1.1", "1.2.3.-4",
            "1..2.3", "1.2.3.4/33", "1.2.3.4/", "1.2.3.4/a", "1.2.3.4/24/1",
            " 1.2.3.4", "0001.2.3.4", "::1",
        ] {
            assert!(
                matches!(AddressPattern::parse(bad), Err(PolicyError::InvalidAddressFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_block_containment() {
        let block = AddressPattern::parse("10.0.0.0/24").unwrap();
        assert!(block.contains(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(block.contains(Ipv4Addr::new(10, 0, 0, 255)));
        assert!(!block.contains(Ipv4Addr::new(10, 0, 1, 5)));
    }

    #[test]
    fn test_block_edges() {
        let everything = AddressPattern::parse("0.0.0.0/0").unwrap();
        assert!(everything.contains(Ipv4Addr::new(203, 0, 113, 9)));

        let single = AddressPattern::parse("172.16.4.20/32").unwrap();
        assert!(single.contains(Ipv4Addr::new(172, 16, 4, 20)));
        assert!(!single.contains(Ipv4Addr::new(172, 16, 4, 21)));

        // host bits set in the literal
        let loose = AddressPattern::parse("10.0.0.77/24").unwrap();
        assert!(loose.contains(Ipv4Addr::new(10, 0, 0, 1)));
    }
}
