//! Probe execution and the per-request Prometheus collector.
//!
//! A probe runs in two phases. [`Prober::probe`] awaits the whois lookup and
//! parses the response into a [`ProbeOutcome`]; it never fails, every error
//! is folded into the outcome. [`ProbeCollector`] then owns that outcome for
//! the lifetime of one request and turns it into samples when its registry
//! is gathered. The split exists because `Collector::collect` is
//! synchronous while the lookup is not.

use crate::error::ExporterError;
use crate::metrics::{MetricDescriptors, DOMAIN_LABEL};
use crate::parser::parse_record;
use crate::protocols::WhoisClient;
use crate::types::{ProbeOutcome, Target};
use chrono::{DateTime, Utc};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;
use std::time::Instant;
use tracing::{info, warn};

/// Runs lookups and parsing for probe requests.
#[derive(Debug, Clone, Default)]
pub struct Prober {
    client: WhoisClient,
}

impl Prober {
    pub fn new(client: WhoisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WhoisClient {
        &self.client
    }

    /// Look up and parse one target.
    ///
    /// Exactly one lookup is made, no retries. Lookup failures, missing
    /// fields and unparseable values all produce `success == false`.
    pub async fn probe(&self, target: Target) -> ProbeOutcome {
        let start_time = Instant::now();

        let result = match self.client.lookup(&target).await {
            Ok(raw) => parse_record(&raw).complete(),
            Err(e) => Err(e),
        };

        let duration = start_time.elapsed();

        match result {
            Ok((paid_till, free_date)) => {
                info!(
                    domain = %target,
                    success = true,
                    paid_till = %paid_till,
                    free_date = %free_date,
                    duration_ms = duration.as_millis() as u64,
                    "Collected domain registration dates"
                );
                ProbeOutcome::succeeded(target, paid_till, free_date, duration)
            }
            Err(e) => {
                log_failure(&target, &e);
                ProbeOutcome::failed(target, &e, duration)
            }
        }
    }
}

fn log_failure(target: &Target, error: &ExporterError) {
    if error.is_lookup_error() {
        warn!(domain = %target, error = %error, "Whois lookup failed");
    } else {
        warn!(domain = %target, error = %error, "Whois response could not be parsed");
    }
}

/// Collector bound to exactly one probe outcome.
///
/// Timestamp gauges hold the seconds remaining from the moment of
/// collection until the date, so they go negative once a date has passed.
/// A failed probe reports only `domain_success 0`.
pub struct ProbeCollector {
    outcome: ProbeOutcome,
    /// Fixed collection instant; `None` means "now" at each collect
    reference_time: Option<DateTime<Utc>>,
    success: GaugeVec,
    paid_till: GaugeVec,
    free_date: GaugeVec,
}

impl ProbeCollector {
    pub fn new(
        descriptors: &MetricDescriptors,
        outcome: ProbeOutcome,
    ) -> Result<Self, ExporterError> {
        Ok(Self {
            outcome,
            reference_time: None,
            success: GaugeVec::new(descriptors.success.clone(), &[DOMAIN_LABEL])?,
            paid_till: GaugeVec::new(descriptors.paid_till.clone(), &[DOMAIN_LABEL])?,
            free_date: GaugeVec::new(descriptors.free_date.clone(), &[DOMAIN_LABEL])?,
        })
    }

    /// Compute remaining seconds against a fixed instant instead of the clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    pub fn outcome(&self) -> &ProbeOutcome {
        &self.outcome
    }
}

fn seconds_until(date: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (date - now).num_milliseconds() as f64 / 1000.0
}

impl Collector for ProbeCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.success
            .desc()
            .into_iter()
            .chain(self.paid_till.desc())
            .chain(self.free_date.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let domain = self.outcome.target.as_str();
        let now = self.reference_time.unwrap_or_else(Utc::now);

        let success = if self.outcome.success { 1.0 } else { 0.0 };
        self.success.with_label_values(&[domain]).set(success);

        if let Some(paid_till) = self.outcome.paid_till {
            self.paid_till
                .with_label_values(&[domain])
                .set(seconds_until(paid_till, now));
        }
        if let Some(free_date) = self.outcome.free_date {
            self.free_date
                .with_label_values(&[domain])
                .set(seconds_until(free_date, now));
        }

        self.success
            .collect()
            .into_iter()
            .chain(self.paid_till.collect())
            .chain(self.free_date.collect())
            .filter(|family| !family.get_metric().is_empty())
            .collect()
    }
}
