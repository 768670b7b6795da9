//! # Peer Transport
//!
//! HTTP plumbing between nodes:
//!
//! - [`HttpRootSource`] fetches the root node's chain and pool for the
//!   startup sync.
//! - [`PeerBroadcaster`] drains the pubsub bus and POSTs every message to
//!   each configured peer's `/api/pubsub`.
//!
//! Delivery is fire-and-forget. A failed POST is logged and counted, never
//! retried; a peer that was down simply misses the update.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use cryptochain_protocol::ledger::Block;
use cryptochain_protocol::network::{PubSubMessage, SyncError, SyncSource, TransactionMap};

use crate::metrics::SharedMetrics;

/// Per-request timeout for peer deliveries.
const PEER_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

// ---------------------------------------------------------------------------
// Root source
// ---------------------------------------------------------------------------

pub struct HttpRootSource {
    client: reqwest::Client,
    root_url: String,
}

impl HttpRootSource {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            root_url: root_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let url = format!("{}{}", base_url(&self.root_url), path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SyncSource for HttpRootSource {
    async fn fetch_chain(&self) -> Result<Vec<Block>, SyncError> {
        self.get_json("/api/blocks").await
    }

    async fn fetch_transaction_map(&self) -> Result<TransactionMap, SyncError> {
        self.get_json("/api/transaction-pool-map").await
    }
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

pub struct PeerBroadcaster {
    client: reqwest::Client,
    peers: Vec<String>,
    metrics: SharedMetrics,
}

impl PeerBroadcaster {
    pub fn new(peers: Vec<String>, metrics: SharedMetrics) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PEER_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            peers,
            metrics,
        })
    }

    /// Forwards bus messages to every peer until the bus closes.
    pub async fn run(self, mut rx: broadcast::Receiver<PubSubMessage>) {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    self.deliver(&message).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "peer broadcaster lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// POSTs `message` to all peers concurrently. Returns how many accepted
    /// it with a success status. Only unreachable peers count as failures.
    pub async fn deliver(&self, message: &PubSubMessage) -> usize {
        let sends = self.peers.iter().map(|peer| async move {
            let url = format!("{}/api/pubsub", base_url(peer));
            match self.client.post(&url).json(message).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(peer = %peer, channel = message.channel.name(), "delivered");
                    true
                }
                Ok(response) => {
                    // Reached but refused, e.g. a peer keeping its longer chain.
                    debug!(peer = %peer, status = %response.status(), "peer declined message");
                    false
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "failed to reach peer");
                    self.metrics.peer_delivery_failures_total.inc();
                    false
                }
            }
        });

        join_all(sends).await.into_iter().filter(|ok| *ok).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NodeMetrics;
    use cryptochain_protocol::network::Channel;
    use std::sync::Arc;

    #[test]
    fn base_url_trims_trailing_slashes() {
        assert_eq!(base_url("http://localhost:3000/"), "http://localhost:3000");
        assert_eq!(base_url("http://localhost:3000"), "http://localhost:3000");
    }

    #[tokio::test]
    async fn unreachable_root_is_reported() {
        let source = HttpRootSource::new("http://127.0.0.1:1");
        assert!(matches!(
            source.fetch_chain().await,
            Err(SyncError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_peer_is_counted() {
        let metrics = Arc::new(NodeMetrics::new().unwrap());
        let broadcaster =
            PeerBroadcaster::new(vec!["http://127.0.0.1:1".into()], metrics.clone()).unwrap();
        let message = PubSubMessage {
            origin: "n1".into(),
            channel: Channel::Chain(vec![Block::genesis()]),
        };

        assert_eq!(broadcaster.deliver(&message).await, 0);
        assert_eq!(metrics.peer_delivery_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn declining_peer_is_not_counted_as_accepted() {
        use axum::{http::StatusCode, routing::post, Router};

        let app = Router::new().route("/api/pubsub", post(|| async { StatusCode::CONFLICT }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let metrics = Arc::new(NodeMetrics::new().unwrap());
        let broadcaster =
            PeerBroadcaster::new(vec![format!("http://{addr}")], metrics.clone()).unwrap();
        let message = PubSubMessage {
            origin: "n1".into(),
            channel: Channel::Chain(vec![Block::genesis()]),
        };

        assert_eq!(broadcaster.deliver(&message).await, 0);
        assert_eq!(metrics.peer_delivery_failures_total.get(), 0);
    }
}
