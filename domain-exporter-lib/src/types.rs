//! Core data types for domain probing.
//!
//! This module defines the probe target and the outcome a single probe
//! produces. Both live for exactly one HTTP request.

use crate::error::ExporterError;
use crate::utils::normalize_target;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// A normalized domain name accepted for probing.
///
/// Constructed only through [`Target::parse`], so an instance is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    /// Normalize and accept a raw target value.
    ///
    /// See [`normalize_target`] for the rules applied.
    pub fn parse(raw: &str, strip_www: bool) -> Result<Self, ExporterError> {
        normalize_target(raw, strip_www).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of probing one domain.
///
/// `success` is true only when the lookup finished and both `paid_till` and
/// `free_date` were found and parsed; in that case both are `Some`. A failed
/// probe carries no timestamps and an `error` describing why.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// The domain that was probed
    pub target: Target,

    /// Whether lookup and parsing both completed
    pub success: bool,

    /// Registration expiry (`paid-till`)
    pub paid_till: Option<DateTime<Utc>>,

    /// Date the name becomes available again (`free-date`), at midnight UTC
    pub free_date: Option<DateTime<Utc>>,

    /// Time spent in lookup and parsing
    pub duration: Duration,

    /// Failure cause when `success` is false
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn succeeded(
        target: Target,
        paid_till: DateTime<Utc>,
        free_date: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            target,
            success: true,
            paid_till: Some(paid_till),
            free_date: Some(free_date),
            duration,
            error: None,
        }
    }

    pub fn failed(target: Target, error: &ExporterError, duration: Duration) -> Self {
        Self {
            target,
            success: false,
            paid_till: None,
            free_date: None,
            duration,
            error: Some(error.to_string()),
        }
    }
}
