//! HTTP handlers

pub mod health;
pub mod access;
pub mod whitelist;
pub mod stats;
