//! HTTP routes hosting the probe pipeline.
//!
//! - `/` serves a static landing page
//! - `/metrics` serves process and exporter self-metrics
//! - `/probe?target=<domain>` runs one probe and serves its samples
//!
//! Each `/probe` request gets its own `Registry` holding a single
//! [`ProbeCollector`]; registries are never reused across requests.

use crate::collector::{ProbeCollector, Prober};
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::metrics::{MetricDescriptors, ServiceMetrics};
use crate::protocols::WhoisClient;
use crate::types::{ProbeOutcome, Target};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;

const INDEX_PAGE: &str = r#"<html>
    <head>
        <title>Domain Exporter</title>
    </head>
    <body>
        <h1>Domain Exporter</h1>
        <p><a href="/metrics">Metrics</a></p>
        <p><a href="/probe?target=ya.ru">Probe ya.ru</a></p>
    </body>
</html>
"#;

/// State shared by every request. Nothing in it is mutated after startup
/// apart from the atomic self-metrics.
pub struct AppState {
    descriptors: MetricDescriptors,
    prober: Prober,
    service_metrics: ServiceMetrics,
    strip_www: bool,
}

impl AppState {
    pub fn new(prober: Prober, strip_www: bool) -> Result<Self, ExporterError> {
        Ok(Self {
            descriptors: MetricDescriptors::new(),
            prober,
            service_metrics: ServiceMetrics::new()?,
            strip_www,
        })
    }

    pub fn from_config(config: &ExporterConfig) -> Result<Self, ExporterError> {
        let client = WhoisClient::with_timeout(config.timeout)
            .command(config.whois_command.clone())
            .server(config.whois_server.clone());
        Self::new(Prober::new(client), config.strip_www)
    }
}

/// Build the router with all routes attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(service_metrics))
        .route("/probe", get(probe))
        .with_state(Arc::new(state))
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn service_metrics(State(state): State<Arc<AppState>>) -> Response {
    encode_response(&state.service_metrics.registry().gather())
}

async fn probe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let target = match Target::parse(first_target(&params), state.strip_www) {
        Ok(target) => target,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let outcome = state.prober.probe(target).await;
    state
        .service_metrics
        .observe_probe(outcome.success, outcome.duration.as_secs_f64());

    match gather_probe(&state.descriptors, outcome) {
        Ok(families) => encode_response(&families),
        Err(e) => {
            error!(error = %e, "Failed to gather probe metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// The first `target` value wins when the parameter is repeated.
fn first_target(params: &[(String, String)]) -> &str {
    params
        .iter()
        .find(|(key, _)| key == "target")
        .map(|(_, value)| value.as_str())
        .unwrap_or("")
}

/// Register one collector on a fresh registry and gather it.
fn gather_probe(
    descriptors: &MetricDescriptors,
    outcome: ProbeOutcome,
) -> Result<Vec<MetricFamily>, ExporterError> {
    let registry = Registry::new();
    registry.register(Box::new(ProbeCollector::new(descriptors, outcome)?))?;
    Ok(registry.gather())
}

fn encode_response(families: &[MetricFamily]) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gather_probe_uses_isolated_registries() {
        let descriptors = MetricDescriptors::new();
        let fail = |name: &str| {
            ProbeOutcome::failed(
                Target::parse(name, true).unwrap(),
                &ExporterError::field_missing("paid-till"),
                Duration::ZERO,
            )
        };

        // Same descriptors registered twice would collide on a shared registry
        let first = gather_probe(&descriptors, fail("a.example")).unwrap();
        let second = gather_probe(&descriptors, fail("b.example")).unwrap();

        for (families, expected) in [(first, "a.example"), (second, "b.example")] {
            assert_eq!(families.len(), 1);
            let metrics = families[0].get_metric();
            assert_eq!(metrics.len(), 1);
            assert_eq!(metrics[0].get_label()[0].get_value(), expected);
        }
    }

    #[test]
    fn test_first_target() {
        let params = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        assert_eq!(first_target(&params(&[("target", "a.example")])), "a.example");
        assert_eq!(
            first_target(&params(&[("target", "a.example"), ("target", "b.example")])),
            "a.example"
        );
        assert_eq!(
            first_target(&params(&[("module", "x"), ("target", "b.example")])),
            "b.example"
        );
        assert_eq!(first_target(&params(&[("target", ""), ("target", "b.example")])), "");
        assert_eq!(first_target(&[]), "");
    }

    #[test]
    fn test_index_page_links() {
        assert!(INDEX_PAGE.contains("href=\"/metrics\""));
        assert!(INDEX_PAGE.contains("href=\"/probe?target="));
    }
}
