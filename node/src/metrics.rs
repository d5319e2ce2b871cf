//! # Prometheus Metrics
//!
//! Gateway metrics, scraped at `/metrics` on the metrics port. Everything is
//! registered in a dedicated [`prometheus::Registry`] under the `datamarket`
//! prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metric handles for the gateway.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Transactions simulated on behalf of a client.
    pub transactions_submitted_total: IntCounter,
    /// Transactions that made it into a block.
    pub transactions_committed_total: IntCounter,
    /// Transactions whose chaincode response was an error.
    pub transactions_rejected_total: IntCounter,
    /// Transactions dropped at commit because a read went stale.
    pub mvcc_conflicts_total: IntCounter,
    /// Read-only evaluations.
    pub queries_total: IntCounter,
    /// Contract events delivered to listeners.
    pub events_published_total: IntCounter,
    /// Height of the latest committed block.
    pub block_height: IntGauge,
    /// Connected WebSocket subscribers.
    pub ws_subscribers: IntGauge,
    /// Simulate-to-commit latency.
    pub transaction_latency_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let c = IntCounter::new(name, help).expect("metric creation");
    registry
        .register(Box::new(c.clone()))
        .expect("metric registration");
    c
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let g = IntGauge::new(name, help).expect("metric creation");
    registry
        .register(Box::new(g.clone()))
        .expect("metric registration");
    g
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("datamarket".into()), None)
            .expect("failed to create prometheus registry");

        let transactions_submitted_total = counter(
            &registry,
            "transactions_submitted_total",
            "Transactions simulated for submission",
        );
        let transactions_committed_total = counter(
            &registry,
            "transactions_committed_total",
            "Transactions committed to the ledger",
        );
        let transactions_rejected_total = counter(
            &registry,
            "transactions_rejected_total",
            "Transactions rejected by their chaincode",
        );
        let mvcc_conflicts_total = counter(
            &registry,
            "mvcc_conflicts_total",
            "Transactions rejected for a stale read",
        );
        let queries_total = counter(&registry, "queries_total", "Read-only evaluations");
        let events_published_total = counter(
            &registry,
            "events_published_total",
            "Contract events published to listeners",
        );
        let block_height = gauge(&registry, "block_height", "Height of the latest committed block");
        let ws_subscribers = gauge(&registry, "ws_subscribers", "Connected WebSocket subscribers");

        let transaction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "transaction_latency_seconds",
                "Simulate-to-commit transaction latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(transaction_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            transactions_submitted_total,
            transactions_committed_total,
            transactions_rejected_total,
            mvcc_conflicts_total,
            queries_total,
            events_published_total,
            block_height,
            ws_subscribers,
            transaction_latency_seconds,
        }
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics` in the Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
