//! Data models

pub mod access;
pub mod whitelist;

pub use access::*;
pub use whitelist::*;
