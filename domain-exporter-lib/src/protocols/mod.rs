//! Protocol implementations for domain lookups.
//!
//! Only WHOIS is used: the registration dates this exporter reports are not
//! published over RDAP by the registries it targets.

/// WHOIS protocol implementation
pub mod whois;

pub use whois::WhoisClient;
