//! # Domain Exporter Library
//!
//! A Prometheus probe that reports domain registration dates taken from whois.
//!
//! Each probe runs the system `whois` program for one domain under a
//! deadline, extracts the `paid-till` and `free-date` fields from the raw
//! text, and exposes them as gauges from a registry that exists only for
//! that request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_exporter_lib::{serve, AppState, ExporterConfig};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExporterConfig::default();
//!     let listener = TcpListener::bind("127.0.0.1:9203").await?;
//!     serve(listener, AppState::from_config(&config)?, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Exposed metrics
//!
//! - `domain_success{domain}`: 1 when lookup and parsing succeeded
//! - `domain_paid_till_seconds{domain}`: seconds until `paid-till`
//! - `domain_free_date_seconds{domain}`: seconds until `free-date`

// Re-export main public API types and functions
// This makes them available as domain_exporter_lib::TypeName
pub use collector::{ProbeCollector, Prober};
pub use config::{load_env_config, ConfigManager, EnvConfig, ExporterConfig, FileConfig};
pub use error::ExporterError;
pub use metrics::{MetricDescriptors, ServiceMetrics};
pub use parser::{parse_record, Field, ParsedRecord};
pub use protocols::WhoisClient;
pub use server::{router, serve, AppState};
pub use types::{ProbeOutcome, Target};
pub use utils::{normalize_target, resolve_listen_address};

// Public modules
pub mod config;
pub mod parser;

// Internal modules - these are not part of the public API
mod collector;
mod error;
mod metrics;
mod protocols;
mod server;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ExporterError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
