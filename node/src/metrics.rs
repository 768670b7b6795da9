//! # Prometheus Metrics
//!
//! Operational metrics for a node, served at `/metrics`. Everything is
//! registered in a dedicated registry under the `cryptochain` prefix.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use cryptochain_protocol::network::NodeState;

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Blocks in the local chain, genesis included.
    pub chain_length: IntGauge,
    /// Transactions waiting in the pool.
    pub transactions_in_pool: IntGauge,
    /// Transactions created or amended through the API.
    pub transactions_submitted_total: IntCounter,
    /// Blocks mined by this node.
    pub blocks_mined_total: IntCounter,
    /// Peer chains adopted through pubsub or sync.
    pub chain_replacements_total: IntCounter,
    /// Startup sync fetches that failed.
    pub sync_failures_total: IntCounter,
    /// Broadcasts that could not be delivered to a peer.
    pub peer_delivery_failures_total: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("cryptochain".into()), None)?;

        let chain_length = IntGauge::new("chain_length", "Number of blocks in the local chain")?;
        registry.register(Box::new(chain_length.clone()))?;

        let transactions_in_pool =
            IntGauge::new("transactions_in_pool", "Pending transactions in the pool")?;
        registry.register(Box::new(transactions_in_pool.clone()))?;

        let transactions_submitted_total = IntCounter::new(
            "transactions_submitted_total",
            "Transactions created or amended through the API",
        )?;
        registry.register(Box::new(transactions_submitted_total.clone()))?;

        let blocks_mined_total = IntCounter::new("blocks_mined_total", "Blocks mined by this node")?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let chain_replacements_total = IntCounter::new(
            "chain_replacements_total",
            "Times the local chain was replaced by a peer's",
        )?;
        registry.register(Box::new(chain_replacements_total.clone()))?;

        let sync_failures_total =
            IntCounter::new("sync_failures_total", "Failed startup sync fetches")?;
        registry.register(Box::new(sync_failures_total.clone()))?;

        let peer_delivery_failures_total = IntCounter::new(
            "peer_delivery_failures_total",
            "Broadcasts that could not be delivered to a peer",
        )?;
        registry.register(Box::new(peer_delivery_failures_total.clone()))?;

        Ok(Self {
            registry,
            chain_length,
            transactions_in_pool,
            transactions_submitted_total,
            blocks_mined_total,
            chain_replacements_total,
            sync_failures_total,
            peer_delivery_failures_total,
        })
    }

    /// Refreshes the gauges from the node state.
    pub fn observe(&self, node: &NodeState) {
        self.chain_length.set(node.chain_length() as i64);
        self.transactions_in_pool.set(node.pool.len() as i64);
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

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
