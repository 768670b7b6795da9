//! # REST + WebSocket API
//!
//! The axum router exposing a node's ledger, wallet, and pool. All handlers
//! share one [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                                  |
//! |--------|-------------------------------|----------------------------------------------|
//! | GET    | `/`                           | Node summary                                 |
//! | GET    | `/health`                     | Liveness probe                               |
//! | GET    | `/api/blocks`                 | The full chain                               |
//! | POST   | `/api/mine`                   | Append a block with arbitrary `data`         |
//! | POST   | `/api/transact`               | Send `amount` to `recipient`                 |
//! | GET    | `/api/transaction-pool-map`   | Pending transactions by id                   |
//! | GET    | `/api/mine-transactions`      | Mine the pool into a block                   |
//! | GET    | `/api/wallet-info`            | Node wallet address and live balance         |
//! | POST   | `/api/pubsub`                 | Inbound CHAIN / TRANSACTION message from peer |
//! | GET    | `/ws`                         | Push stream of this node's broadcasts        |
//! | GET    | `/metrics`                    | Prometheus metrics                           |
//!
//! Both mining routes answer with a redirect to `/api/blocks`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRef, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cryptochain_protocol::ledger::BlockData;
use cryptochain_protocol::network::{
    HandleOutcome, PubSub, PubSubError, PubSubMessage, SharedState, TransactionMiner,
};
use cryptochain_protocol::transaction::Transaction;

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub node: SharedState,
    pub pubsub: Arc<PubSub>,
    pub miner: Arc<TransactionMiner>,
    pub metrics: SharedMetrics,
}

impl FromRef<AppState> for SharedMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/blocks", get(blocks_handler))
        .route("/api/mine", post(mine_handler))
        .route("/api/transact", post(transact_handler))
        .route("/api/transaction-pool-map", get(pool_map_handler))
        .route("/api/mine-transactions", get(mine_transactions_handler))
        .route("/api/wallet-info", get(wallet_info_handler))
        .route("/api/pubsub", post(pubsub_handler))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MineRequest {
    #[serde(default)]
    pub data: BlockData,
}

#[derive(Debug, Deserialize)]
pub struct TransactRequest {
    pub amount: u64,
    pub recipient: String,
}

/// `{"type": "success", "transaction": ...}` or `{"type": "error", "message": ...}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ApiResponse {
    Success { transaction: Transaction },
    Error { message: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub name: String,
    pub version: String,
    pub node_id: String,
    pub address: String,
    /// Cached wallet balance; `/api/wallet-info` has the live figure.
    pub balance: u64,
    pub chain_length: usize,
    pub pending_transactions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PubSubResponse {
    pub outcome: HandleOutcome,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(ApiResponse::Error {
            message: message.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /`
async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (address, balance) = {
        let wallet = state.node.wallet.lock();
        (wallet.address().to_string(), wallet.balance())
    };
    Json(IndexResponse {
        name: "cryptochain-node".into(),
        version: state.version.clone(),
        node_id: state.pubsub.node_id().to_string(),
        address,
        balance,
        chain_length: state.node.chain_length(),
        pending_transactions: state.node.pool.len(),
    })
}

/// `GET /health`
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
    })
}

/// `GET /api/blocks`
async fn blocks_handler(State(state): State<AppState>) -> impl IntoResponse {
    let blocks = state.node.chain.read().blocks().to_vec();
    Json(blocks)
}

/// `POST /api/mine` with `{"data": ...}`. No reward, no pool involvement.
async fn mine_handler(State(state): State<AppState>, Json(req): Json<MineRequest>) -> Response {
    let added = state
        .node
        .chain
        .write()
        .add_block(req.data)
        .map(|block| block.hash.clone());

    match added {
        Ok(hash) => {
            tracing::info!(%hash, "block added through api");
            state.pubsub.broadcast_chain();
            state.metrics.blocks_mined_total.inc();
            state.metrics.observe(&state.node);
            Redirect::to("/api/blocks").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to add block");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// `POST /api/transact` with `{"amount": n, "recipient": "..."}`.
async fn transact_handler(
    State(state): State<AppState>,
    req: Result<Json<TransactRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match req {
        Ok(req) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "malformed transact request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.node.transact(req.amount, &req.recipient) {
        Ok(transaction) => {
            state.pubsub.broadcast_transaction(&transaction);
            state.metrics.transactions_submitted_total.inc();
            state.metrics.observe(&state.node);
            Json(ApiResponse::Success { transaction }).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "transaction rejected");
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// `GET /api/transaction-pool-map`
async fn pool_map_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.node.pool.transaction_map())
}

/// `GET /api/mine-transactions`
async fn mine_transactions_handler(State(state): State<AppState>) -> Response {
    match state.miner.mine_transactions() {
        Ok(_) => {
            state.metrics.blocks_mined_total.inc();
            state.metrics.observe(&state.node);
            Redirect::to("/api/blocks").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "mining failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// `GET /api/wallet-info`
async fn wallet_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.node.wallet_info())
}

/// `POST /api/pubsub`: a peer delivering a CHAIN or TRANSACTION message.
///
/// A rejected chain answers 409, an invalid transaction 400. Either way
/// nothing changes.
async fn pubsub_handler(
    State(state): State<AppState>,
    Json(message): Json<PubSubMessage>,
) -> Response {
    match state.pubsub.handle_message(message) {
        Ok(outcome) => {
            if outcome == HandleOutcome::ChainReplaced {
                state.metrics.chain_replacements_total.inc();
            }
            state.metrics.observe(&state.node);
            Json(PubSubResponse { outcome }).into_response()
        }
        Err(e @ PubSubError::Chain(_)) => {
            tracing::debug!(error = %e, "peer chain rejected");
            error_response(StatusCode::CONFLICT, e)
        }
        Err(e @ PubSubError::Transaction(_)) => {
            tracing::debug!(error = %e, "peer transaction rejected");
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// `GET /ws`: streams every message this node broadcasts.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.pubsub.subscribe();

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Ok(message) => {
                        let payload = match serde_json::to_string(&message) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to serialize ws message");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Push-only channel; client messages are ignored.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use cryptochain_protocol::config::{MINING_REWARD, STARTING_BALANCE};
    use cryptochain_protocol::ledger::{Block, Blockchain};
    use cryptochain_protocol::network::{Channel, NodeState};
    use cryptochain_protocol::vault::Wallet;

    use crate::metrics::NodeMetrics;

    fn test_app_state() -> AppState {
        let node = NodeState::shared(Wallet::new());
        let pubsub = Arc::new(PubSub::new("test-node", node.clone()));
        let miner = Arc::new(TransactionMiner::new(node.clone(), pubsub.clone()));
        AppState {
            version: "0.1.0-test".into(),
            node,
            pubsub,
            miner,
            metrics: Arc::new(NodeMetrics::new().unwrap()),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, req).await
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn index_reports_wallet_and_chain() {
        let state = test_app_state();
        let address = state.node.address();
        let router = create_router(state);

        let (status, body) = get(&router, "/").await;
        let json = json_body(&body);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["address"], json!(address));
        assert_eq!(json["balance"], STARTING_BALANCE);
        assert_eq!(json["chain_length"], 1);
    }

    #[tokio::test]
    async fn blocks_starts_with_genesis() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/api/blocks").await;
        assert_eq!(status, StatusCode::OK);

        let blocks: Vec<Block> = serde_json::from_slice(&body).unwrap();
        assert_eq!(blocks, vec![Block::genesis()]);
    }

    #[tokio::test]
    async fn mine_appends_block_and_redirects() {
        let state = test_app_state();
        let mut bus = state.pubsub.subscribe();
        let router = create_router(state.clone());

        let (status, _) = post_json(&router, "/api/mine", json!({ "data": "hello" })).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(state.node.chain_length(), 2);
        assert!(matches!(bus.recv().await.unwrap().channel, Channel::Chain(_)));
    }

    #[tokio::test]
    async fn transact_success_and_amend() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let bob = Wallet::new();
        let carol = Wallet::new();

        let (status, body) = post_json(
            &router,
            "/api/transact",
            json!({ "amount": 50, "recipient": bob.address() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json = json_body(&body);
        assert_eq!(json["type"], "success");
        let id = json["transaction"]["id"].clone();

        let (_, body) = post_json(
            &router,
            "/api/transact",
            json!({ "amount": 30, "recipient": carol.address() }),
        )
        .await;
        let json = json_body(&body);
        assert_eq!(json["transaction"]["id"], id);
        assert_eq!(json["transaction"]["outputMap"][carol.address()], 30);
        assert_eq!(
            json["transaction"]["outputMap"][state.node.address()],
            STARTING_BALANCE - 80
        );

        let (_, body) = get(&router, "/api/transaction-pool-map").await;
        let pool = json_body(&body);
        assert_eq!(pool.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transact_overdraw_is_a_400() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/api/transact",
            json!({ "amount": STARTING_BALANCE + 1, "recipient": "bob" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json = json_body(&body);
        assert_eq!(json["type"], "error");
        assert!(json["message"].as_str().unwrap().contains("exceeds balance"));
    }

    #[tokio::test]
    async fn transact_malformed_amount_is_a_400() {
        let state = test_app_state();
        let router = create_router(state.clone());

        for amount in [json!(-5), json!(2.5)] {
            let (status, body) = post_json(
                &router,
                "/api/transact",
                json!({ "amount": amount, "recipient": "bob" }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let json = json_body(&body);
            assert_eq!(json["type"], "error");
            assert!(json["message"].is_string());
        }
        assert!(state.node.pool.is_empty());
    }

    #[tokio::test]
    async fn mine_transactions_pays_reward() {
        let state = test_app_state();
        let router = create_router(state.clone());
        post_json(&router, "/api/transact", json!({ "amount": 10, "recipient": "bob" })).await;

        let (status, _) = get(&router, "/api/mine-transactions").await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (_, body) = get(&router, "/api/wallet-info").await;
        let json = json_body(&body);
        assert_eq!(json["address"], json!(state.node.address()));
        assert_eq!(json["balance"], STARTING_BALANCE - 10 + MINING_REWARD);

        let (_, body) = get(&router, "/api/transaction-pool-map").await;
        assert_eq!(json_body(&body), json!({}));
    }

    #[tokio::test]
    async fn pubsub_accepts_longer_chain_and_rejects_stale() {
        let state = test_app_state();
        let router = create_router(state.clone());

        let mut remote = Blockchain::new();
        remote.add_block(BlockData::empty()).unwrap();
        let message = PubSubMessage {
            origin: "peer".into(),
            channel: Channel::Chain(remote.blocks().to_vec()),
        };

        let (status, body) =
            post_json(&router, "/api/pubsub", serde_json::to_value(&message).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["outcome"], "chain_replaced");
        assert_eq!(state.node.chain_length(), 2);

        let (status, _) =
            post_json(&router, "/api/pubsub", serde_json::to_value(&message).unwrap()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(state.metrics.chain_replacements_total.get(), 1);
    }

    #[tokio::test]
    async fn pubsub_transaction_lands_in_pool() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let tx = Transaction::new(&Wallet::new(), "bob", 5).unwrap();
        let message = PubSubMessage {
            origin: "peer".into(),
            channel: Channel::Transaction(tx.clone()),
        };

        let (status, _) =
            post_json(&router, "/api/pubsub", serde_json::to_value(&message).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.node.pool.get(tx.id()), Some(tx));
    }

    #[tokio::test]
    async fn pubsub_rejects_transaction_with_rewritten_outputs() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let victim = state.node.address();
        let tx = state.node.transact(10, "bob").unwrap();
        state.node.pool.clear();

        let mut message = serde_json::to_value(&PubSubMessage {
            origin: "peer".into(),
            channel: Channel::Transaction(tx),
        })
        .unwrap();
        let mut outputs = serde_json::Map::new();
        outputs.insert("attacker".into(), json!(900));
        outputs.insert(victim, json!(100));
        message["message"]["outputMap"] = Value::Object(outputs);

        let (status, body) = post_json(&router, "/api/pubsub", message).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["type"], "error");
        assert!(state.node.pool.is_empty());

        // The next local transfer starts clean instead of signing the forgery.
        let (_, body) =
            post_json(&router, "/api/transact", json!({ "amount": 5, "recipient": "bob" })).await;
        let json = json_body(&body);
        assert_eq!(json["type"], "success");
        assert!(json["transaction"]["outputMap"].get("attacker").is_none());
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let router = create_router(test_app_state());
        post_json(&router, "/api/transact", json!({ "amount": 1, "recipient": "bob" })).await;

        let (status, body) = get(&router, "/metrics").await;
        let text = String::from_utf8(body).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("cryptochain_transactions_submitted_total 1"));
        assert!(text.contains("cryptochain_transactions_in_pool 1"));
    }
}
