//! # Prometheus Metrics
//!
//! Operational metrics for the vault node, scraped at `/metrics` on the
//! metrics port. All metrics live in a dedicated [`prometheus::Registry`]
//! prefixed `quorum_`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// The handles are cheap to clone and safe to update from any handler.
#[derive(Clone)]
pub struct WalletMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Transfer requests accepted (executed or not).
    pub transactions_submitted_total: IntCounter,
    /// Approvals recorded after submission.
    pub approvals_recorded_total: IntCounter,
    /// Transfers executed against the ledger.
    pub transfers_executed_total: IntCounter,
    /// Rejected submissions and approvals, labeled by error code.
    pub rejected_operations_total: IntCounterVec,
    /// Transactions currently waiting for approvals.
    pub pending_transactions: IntGauge,
    /// Wallet call latency, labeled by operation (`submit`, `approve`).
    pub operation_latency_seconds: HistogramVec,
}

impl WalletMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("quorum".into()), None)?;

        let transactions_submitted_total = IntCounter::new(
            "transactions_submitted_total",
            "Total number of transfer requests accepted",
        )?;
        registry.register(Box::new(transactions_submitted_total.clone()))?;

        let approvals_recorded_total = IntCounter::new(
            "approvals_recorded_total",
            "Total number of approvals recorded after submission",
        )?;
        registry.register(Box::new(approvals_recorded_total.clone()))?;

        let transfers_executed_total = IntCounter::new(
            "transfers_executed_total",
            "Total number of transfers executed against the ledger",
        )?;
        registry.register(Box::new(transfers_executed_total.clone()))?;

        let rejected_operations_total = IntCounterVec::new(
            Opts::new(
                "rejected_operations_total",
                "Total number of rejected submissions and approvals",
            ),
            &["code"],
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        let pending_transactions = IntGauge::new(
            "pending_transactions",
            "Current number of transactions waiting for approvals",
        )?;
        registry.register(Box::new(pending_transactions.clone()))?;

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of wallet submissions and approvals in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            transactions_submitted_total,
            approvals_recorded_total,
            transfers_executed_total,
            rejected_operations_total,
            pending_transactions,
            operation_latency_seconds,
        })
    }

    /// Counts a rejected operation under its error code.
    pub fn record_rejection(&self, code: &str) {
        self.rejected_operations_total
            .with_label_values(&[code])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<WalletMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_prefixed_and_labeled() {
        let metrics = WalletMetrics::new().unwrap();
        metrics.transactions_submitted_total.inc();
        metrics.record_rejection("zero_amount");
        metrics.record_rejection("zero_amount");
        metrics.pending_transactions.set(3);
        metrics
            .operation_latency_seconds
            .with_label_values(&["submit"])
            .observe(0.002);

        let text = metrics.encode().unwrap();
        assert!(text.contains("quorum_transactions_submitted_total 1"));
        assert!(text.contains("quorum_rejected_operations_total{code=\"zero_amount\"} 2"));
        assert!(text.contains("quorum_pending_transactions 3"));
        assert!(text.contains("quorum_operation_latency_seconds_count{operation=\"submit\"} 1"));
    }

    #[tokio::test]
    async fn handler_serves_text_format() {
        let metrics = Arc::new(WalletMetrics::new().unwrap());
        metrics.transfers_executed_total.inc();

        let resp = metrics_handler(axum::extract::State(metrics))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
