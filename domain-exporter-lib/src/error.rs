//! Error handling for probe operations.
//!
//! This module defines the error type shared by the lookup executor, the
//! record parser, configuration loading and the HTTP layer. Only
//! target errors ever reach a client as an HTTP status; every lookup or
//! parse error is folded into the probe's metric values instead.

use std::fmt;
use std::time::Duration;

/// Main error type for domain probing operations.
#[derive(Debug, Clone)]
pub enum ExporterError {
    /// The `target` query parameter was missing or empty after normalization
    EmptyTarget,

    /// The target would be read as an option by the whois program
    InvalidTarget { target: String, reason: String },

    /// The whois program did not finish before the deadline
    LookupTimeout { domain: String, duration: Duration },

    /// The whois program could not be launched or exited unsuccessfully
    LookupFailed { domain: String, message: String },

    /// A recognized whois field was missing or its value did not parse
    FieldParse {
        field: String,
        value: Option<String>,
        reason: String,
    },

    /// Configuration errors (invalid settings, unreadable TOML, etc.)
    Config { message: String },

    /// File I/O errors when reading configuration files
    FileError { path: String, message: String },

    /// Metric registration or encoding errors
    Metrics { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ExporterError {
    pub fn invalid_target<T: Into<String>, R: Into<String>>(target: T, reason: R) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a new lookup timeout error.
    pub fn lookup_timeout<D: Into<String>>(domain: D, duration: Duration) -> Self {
        Self::LookupTimeout {
            domain: domain.into(),
            duration,
        }
    }

    /// Create a new lookup failure.
    pub fn lookup_failed<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::LookupFailed {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// A recognized field never appeared in the whois text.
    pub fn field_missing<F: Into<String>>(field: F) -> Self {
        Self::FieldParse {
            field: field.into(),
            value: None,
            reason: "not found in whois response".to_string(),
        }
    }

    /// A recognized field appeared but its value could not be parsed.
    pub fn field_invalid<F: Into<String>, V: Into<String>, R: Into<String>>(
        field: F,
        value: V,
        reason: R,
    ) -> Self {
        Self::FieldParse {
            field: field.into(),
            value: Some(value.into()),
            reason: reason.into(),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is caused by client input and maps to HTTP 400.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyTarget | Self::InvalidTarget { .. })
    }

    /// Whether this error came from running the external whois program.
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Self::LookupTimeout { .. } | Self::LookupFailed { .. })
    }
}

impl fmt::Display for ExporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTarget => write!(f, "Target parameter is missing or empty"),
            Self::InvalidTarget { target, reason } => {
                write!(f, "Invalid target '{}': {}", target, reason)
            }
            Self::LookupTimeout { domain, duration } => {
                write!(f, "Whois lookup for '{}' timed out after {:?}", domain, duration)
            }
            Self::LookupFailed { domain, message } => {
                write!(f, "Whois lookup for '{}' failed: {}", domain, message)
            }
            Self::FieldParse {
                field,
                value,
                reason,
            } => {
                if let Some(value) = value {
                    write!(f, "Failed to parse {} value '{}': {}", field, value, reason)
                } else {
                    write!(f, "Failed to parse {}: {}", field, reason)
                }
            }
            Self::Config { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => write!(f, "File error at '{}': {}", path, message),
            Self::Metrics { message } => write!(f, "Metrics error: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ExporterError {}

impl From<std::io::Error> for ExporterError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for ExporterError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<prometheus::Error> for ExporterError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics {
            message: err.to_string(),
        }
    }
}
