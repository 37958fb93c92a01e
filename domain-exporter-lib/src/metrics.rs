//! Metric definitions.
//!
//! [`MetricDescriptors`] describes the per-domain gauges emitted by a probe.
//! It is built once at startup and shared read-only with every request.
//! [`ServiceMetrics`] holds the exporter's own counters, served from
//! `/metrics` next to the process collector.

use crate::error::ExporterError;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

pub const NAMESPACE: &str = "domain";
pub const DOMAIN_LABEL: &str = "domain";

/// Names, help text and label schema of the probe gauges.
#[derive(Debug, Clone)]
pub struct MetricDescriptors {
    pub success: Opts,
    pub paid_till: Opts,
    pub free_date: Opts,
}

impl MetricDescriptors {
    pub fn new() -> Self {
        Self {
            success: Opts::new("success", "Domain check was successful")
                .namespace(NAMESPACE)
                .variable_label(DOMAIN_LABEL),
            paid_till: Opts::new(
                "paid_till_seconds",
                "Seconds until the domain registration expires (paid-till)",
            )
            .namespace(NAMESPACE)
            .variable_label(DOMAIN_LABEL),
            free_date: Opts::new(
                "free_date_seconds",
                "Seconds until the domain is released for registration (free-date)",
            )
            .namespace(NAMESPACE)
            .variable_label(DOMAIN_LABEL),
        }
    }
}

impl Default for MetricDescriptors {
    fn default() -> Self {
        Self::new()
    }
}

/// Exporter self-metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    probes: IntCounterVec,
    probe_duration: HistogramVec,
}

impl ServiceMetrics {
    /// Build the service registry, including the process collector where
    /// the platform supports it.
    pub fn new() -> Result<Self, ExporterError> {
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        let probes = IntCounterVec::new(
            Opts::new("probes_total", "Number of probes served, by result")
                .namespace("domain_exporter"),
            &["result"],
        )?;
        let probe_duration = HistogramVec::new(
            HistogramOpts::new(
                "probe_duration_seconds",
                "Time spent on whois lookup and parsing",
            )
            .namespace("domain_exporter")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0]),
            &["result"],
        )?;

        registry.register(Box::new(probes.clone()))?;
        registry.register(Box::new(probe_duration.clone()))?;

        Ok(Self {
            registry,
            probes,
            probe_duration,
        })
    }

    pub fn observe_probe(&self, success: bool, seconds: f64) {
        let result = if success { "success" } else { "failure" };
        self.probes.with_label_values(&[result]).inc();
        self.probe_duration
            .with_label_values(&[result])
            .observe(seconds);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
