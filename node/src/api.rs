//! # REST + WebSocket API
//!
//! The axum router in front of the [`Gateway`]. Write endpoints name the
//! organization to act as in the `org` body field; read endpoints take it
//! as a query parameter and fall back to the token publisher's
//! organization.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                          |
//! |--------|-----------------------------|--------------------------------------|
//! | GET    | `/health`                   | Liveness probe                       |
//! | GET    | `/status`                   | Channel, height and state root       |
//! | GET    | `/token/info`               | Token metadata                       |
//! | GET    | `/token/supply`             | Total supply                         |
//! | GET    | `/token/balance/:account`   | Balance of an account                |
//! | GET    | `/token/whoami`             | Identity of the acting organization  |
//! | POST   | `/token/mint`               | Mint (publisher only)                |
//! | POST   | `/token/transfer`           | Transfer between accounts            |
//! | POST   | `/data/upload`              | Commit a content record              |
//! | POST   | `/data/compare-and-put`     | Verify, disclose and settle          |
//! | GET    | `/data/:owner_org/:id`      | Read a record from a private store   |
//! | GET    | `/ws`                       | Live committed blocks and events     |
//!
//! Chaincode error statuses become HTTP statuses: validation 400, unpaid
//! 402, authorization 403, not found 404, integrity mismatch 422, failed
//! settlement 502. A commit-time read conflict is 409 and may be retried.
//! A request body that does not decode is 400 with kind `validation`, so
//! 422 only ever means a disclosed record failed its hash check.

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use datamarket_contracts::{DataMarketInvocation, DisclosureRequest, ErrorKind, TokenInvocation};
use datamarket_protocol::storage::CommitReceipt;

use crate::gateway::{Gateway, GatewayError};
use crate::listener::NodeEvent;
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub gateway: Arc<Gateway>,
    /// Broadcast channel the listener publishes committed events on.
    pub event_tx: broadcast::Sender<NodeEvent>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/token/info", get(token_info_handler))
        .route("/token/supply", get(total_supply_handler))
        .route("/token/balance/:account", get(balance_handler))
        .route("/token/whoami", get(whoami_handler))
        .route("/token/mint", post(mint_handler))
        .route("/token/transfer", post(transfer_handler))
        .route("/data/upload", post(upload_handler))
        .route("/data/compare-and-put", post(compare_and_put_handler))
        .route("/data/:owner_org/:content_id", get(private_data_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Optional `?org=` selecting the identity for a query.
#[derive(Debug, Default, Deserialize)]
pub struct ActingOrg {
    pub org: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MintRequest {
    pub org: Option<String>,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub org: Option<String>,
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub org: String,
    pub owner: Option<String>,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareAndPutRequest {
    /// Organization submitting the transaction; receives the content.
    pub org: String,
    pub owner_org: String,
    pub content_id: String,
    /// Exact record bytes returned by the upload, as text.
    pub content: String,
    pub buyer: String,
    pub seller: String,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub channel: String,
    pub block_height: u64,
    /// Hex-encoded BLAKE3 root over committed state.
    pub state_root: String,
    pub chaincodes: Vec<String>,
    pub organizations: Vec<String>,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for committed transactions.
#[derive(Debug, Serialize, Deserialize)]
pub struct TxResponse {
    pub tx_id: String,
    pub block_number: u64,
    /// Chaincode payload, as JSON when it parses and as a string otherwise.
    pub result: serde_json::Value,
}

impl From<CommitReceipt> for TxResponse {
    fn from(receipt: CommitReceipt) -> Self {
        Self {
            tx_id: receipt.tx_id,
            block_number: receipt.block_number,
            result: payload_value(&receipt.payload),
        }
    }
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn payload_value(payload: &[u8]) -> serde_json::Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(payload).into_owned()))
}

fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::UnknownOrganization(_) => StatusCode::BAD_REQUEST,
        GatewayError::Conflict { .. } => StatusCode::CONFLICT,
        GatewayError::UnknownChaincode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::Rejected { .. } => match err.kind() {
            Some(ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            Some(ErrorKind::InsufficientFunds) => StatusCode::PAYMENT_REQUIRED,
            Some(ErrorKind::Authorization) => StatusCode::FORBIDDEN,
            Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            Some(ErrorKind::Integrity) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(ErrorKind::Dependency) => StatusCode::BAD_GATEWAY,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorResponse {
            kind: self.kind().map(|k| k.to_string()),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Body-decoding failures share the error shape of chaincode rejections.
fn malformed_body(rejection: JsonRejection) -> Response {
    tracing::debug!(status = %rejection.status(), "rejected request body: {}", rejection.body_text());
    let body = ErrorResponse {
        error: rejection.body_text(),
        kind: Some(ErrorKind::Validation.to_string()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn committed(result: Result<CommitReceipt, GatewayError>) -> Response {
    match result {
        Ok(receipt) => (StatusCode::OK, Json(TxResponse::from(receipt))).into_response(),
        Err(e) => e.into_response(),
    }
}

fn acting<'a>(state: &'a AppState, org: &'a Option<String>) -> &'a str {
    org.as_deref()
        .unwrap_or_else(|| state.gateway.default_organization())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: liveness probe.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.gateway.ledger();
    let resp = StatusResponse {
        version: state.version.clone(),
        channel: ledger.channel().to_string(),
        block_height: ledger.height(),
        state_root: hex::encode(ledger.state_root()),
        chaincodes: ledger.registry().names().into_iter().map(String::from).collect(),
        organizations: state.gateway.wallet().organizations().map(String::from).collect(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `GET /token/info`
async fn token_info_handler(
    State(state): State<AppState>,
    Query(q): Query<ActingOrg>,
) -> Response {
    match state
        .gateway
        .evaluate_token(acting(&state, &q.org), &TokenInvocation::TokenInfo)
    {
        Ok(payload) => Json(payload_value(&payload)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /token/supply`
async fn total_supply_handler(
    State(state): State<AppState>,
    Query(q): Query<ActingOrg>,
) -> Response {
    match state
        .gateway
        .evaluate_token(acting(&state, &q.org), &TokenInvocation::TotalSupply)
    {
        Ok(payload) => Json(serde_json::json!({ "totalSupply": payload_value(&payload) })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /token/balance/:account`
async fn balance_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
    Query(q): Query<ActingOrg>,
) -> Response {
    let query = TokenInvocation::BalanceOf {
        account: account.clone(),
    };
    match state.gateway.evaluate_token(acting(&state, &q.org), &query) {
        Ok(payload) => Json(serde_json::json!({
            "account": account,
            "balance": payload_value(&payload),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /token/whoami`
async fn whoami_handler(State(state): State<AppState>, Query(q): Query<ActingOrg>) -> Response {
    match state
        .gateway
        .evaluate_token(acting(&state, &q.org), &TokenInvocation::WhoAmI)
    {
        Ok(payload) => Json(payload_value(&payload)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /token/mint`
async fn mint_handler(
    State(state): State<AppState>,
    body: Result<Json<MintRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    let mint = TokenInvocation::Mint {
        to: req.to,
        amount: req.amount,
    };
    committed(state.gateway.submit_token(acting(&state, &req.org), &mint))
}

/// `POST /token/transfer`
async fn transfer_handler(
    State(state): State<AppState>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    let transfer = TokenInvocation::Transfer {
        from: req.from,
        to: req.to,
        amount: req.amount,
    };
    committed(state.gateway.submit_token(acting(&state, &req.org), &transfer))
}

/// `POST /data/upload`. The result is the stored record. Keep its exact
/// text; it is what a buyer presents to `compare-and-put`.
async fn upload_handler(
    State(state): State<AppState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    let upload = DataMarketInvocation::UploadPrivateData {
        owner: req.owner,
        description: req.description,
    };
    match state.gateway.submit_market(&req.org, &upload) {
        Ok(receipt) => {
            let record = String::from_utf8_lossy(&receipt.payload).into_owned();
            let mut body = TxResponse::from(receipt);
            body.result = serde_json::json!({
                "record": payload_value(record.as_bytes()),
                "content": record,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `POST /data/compare-and-put`
async fn compare_and_put_handler(
    State(state): State<AppState>,
    body: Result<Json<CompareAndPutRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed_body(rejection),
    };
    let disclose = DataMarketInvocation::CompareAndPutPrivateData(DisclosureRequest {
        owner_org: req.owner_org,
        content_id: req.content_id,
        claimed_content: req.content.into_bytes(),
        buyer: req.buyer,
        seller: req.seller,
    });
    committed(state.gateway.submit_market(&req.org, &disclose))
}

/// `GET /data/:owner_org/:content_id`. Defaults to acting as the owner,
/// the only organization allowed to read its own store.
async fn private_data_handler(
    Path((owner_org, content_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(q): Query<ActingOrg>,
) -> Response {
    let org = q.org.as_deref().unwrap_or(owner_org.as_str()).to_string();
    let read = DataMarketInvocation::GetPrivateData {
        content_id,
        owner_org,
    };
    match state.gateway.evaluate_market(&org, &read) {
        Ok(payload) => Json(payload_value(&payload)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /ws`: WebSocket stream of [`NodeEvent`]s. Client messages are
/// ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();
    state.metrics.ws_subscribers.inc();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    state.metrics.ws_subscribers.dec();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkProfile;
    use crate::listener::EventListener;
    use crate::metrics::NodeMetrics;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        let metrics = Arc::new(NodeMetrics::new());
        let (event_tx, _) = broadcast::channel(64);
        let gateway = Gateway::bootstrap(
            NetworkProfile::default(),
            EventListener::new(event_tx.clone(), Arc::clone(&metrics)),
            Arc::clone(&metrics),
        )
        .expect("bootstrap");

        AppState {
            version: "0.1.0-test".into(),
            gateway: Arc::new(gateway),
            event_tx,
            metrics,
        }
    }

    /// Sends a GET request and returns the status and JSON body.
    async fn get(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Sends a POST request with JSON body and returns (status, body).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn fund_ws1(router: &Router, amount: u64) {
        let (status, _) = post_json(
            router,
            "/token/mint",
            serde_json::json!({ "org": "Intage", "to": "WS1", "amount": amount }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn upload(router: &Router, description: &str) -> (String, String) {
        let (status, body) = post_json(
            router,
            "/data/upload",
            serde_json::json!({ "org": "Intage", "description": description }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["tx_id"].as_str().unwrap().to_string(),
            body["result"]["content"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, json) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_bootstrapped_ledger() {
        let router = create_router(test_app_state());
        let (status, json) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.block_height, 2);
        assert_eq!(resp.channel, "mychannel");
        assert_eq!(resp.state_root.len(), 64);
        assert_eq!(resp.organizations, vec!["Intage", "WS1"]);
    }

    #[tokio::test]
    async fn token_queries() {
        let router = create_router(test_app_state());

        let (status, info) = get(&router, "/token/info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["symbol"], "ITK");
        assert_eq!(info["totalSupply"], 1000);

        let (_, supply) = get(&router, "/token/supply").await;
        assert_eq!(supply["totalSupply"], 1000);

        let (_, balance) = get(&router, "/token/balance/Intage").await;
        assert_eq!(balance["balance"], 1000);

        let (_, me) = get(&router, "/token/whoami?org=WS1").await;
        assert_eq!(me["mspId"], "WS1MSP");
    }

    #[tokio::test]
    async fn undecodable_body_is_a_validation_error() {
        let router = create_router(test_app_state());

        let (status, body) = post_json(
            &router,
            "/token/mint",
            serde_json::json!({ "org": "Intage", "to": "WS1", "amount": -5 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
        assert!(!body["error"].as_str().unwrap().is_empty());

        let (status, body) = post_json(
            &router,
            "/data/compare-and-put",
            serde_json::json!({ "org": "WS1", "ownerOrg": "IntageMSP" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let (_, supply) = get(&router, "/token/supply").await;
        assert_eq!(supply["totalSupply"], 1000);
    }

    #[tokio::test]
    async fn mint_requires_publisher() {
        let router = create_router(test_app_state());

        let (status, body) = post_json(
            &router,
            "/token/mint",
            serde_json::json!({ "org": "WS1", "to": "WS1", "amount": 10 }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "authorization");

        fund_ws1(&router, 10).await;
        let (_, balance) = get(&router, "/token/balance/WS1").await;
        assert_eq!(balance["balance"], 10);
        let (_, supply) = get(&router, "/token/supply").await;
        assert_eq!(supply["totalSupply"], 1010);
    }

    #[tokio::test]
    async fn transfer_statuses() {
        let router = create_router(test_app_state());

        let (status, body) = post_json(
            &router,
            "/token/transfer",
            serde_json::json!({ "from": "Intage", "to": "WS1", "amount": 25 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["block_number"], 3);

        let (status, _) = post_json(
            &router,
            "/token/transfer",
            serde_json::json!({ "from": "WS1", "to": "Intage", "amount": 26 }),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

        let (status, _) = post_json(
            &router,
            "/token/transfer",
            serde_json::json!({ "from": "", "to": "Intage", "amount": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(
            &router,
            "/token/transfer",
            serde_json::json!({ "org": "Nobody", "from": "WS1", "to": "Intage", "amount": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Nobody"));
    }

    #[tokio::test]
    async fn private_data_is_owner_only() {
        let router = create_router(test_app_state());
        let (id, content) = upload(&router, "panel survey").await;

        let (status, record) = get(&router, &format!("/data/IntageMSP/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["desc"], "panel survey");
        assert!(content.contains(&id));

        let (status, _) = get(&router, &format!("/data/IntageMSP/{id}?org=WS1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get(&router, "/data/IntageMSP/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn paid_disclosure_over_http() {
        let state = test_app_state();
        let mut events = state.event_tx.subscribe();
        let router = create_router(state);
        fund_ws1(&router, 5).await;
        let (id, content) = upload(&router, "panel survey").await;

        let (status, body) = post_json(
            &router,
            "/data/compare-and-put",
            serde_json::json!({
                "org": "WS1",
                "ownerOrg": "IntageMSP",
                "contentId": id,
                "content": content,
                "buyer": "WS1",
                "seller": "Intage",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["recipientOrg"], "WS1MSP");
        assert_eq!(body["result"]["fee"], 1);

        let (_, balance) = get(&router, "/token/balance/WS1").await;
        assert_eq!(balance["balance"], 4);
        let (status, _) = get(&router, &format!("/data/WS1MSP/{id}")).await;
        assert_eq!(status, StatusCode::OK);

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let NodeEvent::Contract { event, .. } = event {
                names.push(event.name());
            }
        }
        assert!(names.ends_with(&["shareEvent", "transferEvent"]));
    }

    #[tokio::test]
    async fn tampered_disclosure_is_unprocessable() {
        let router = create_router(test_app_state());
        fund_ws1(&router, 5).await;
        let (id, _) = upload(&router, "panel survey").await;

        let (status, body) = post_json(
            &router,
            "/data/compare-and-put",
            serde_json::json!({
                "org": "WS1",
                "ownerOrg": "IntageMSP",
                "contentId": id,
                "content": "{\"forged\":true}",
                "buyer": "WS1",
                "seller": "Intage",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "integrity");

        let (_, balance) = get(&router, "/token/balance/WS1").await;
        assert_eq!(balance["balance"], 5);
    }

    #[tokio::test]
    async fn unpaid_disclosure_is_bad_gateway() {
        let router = create_router(test_app_state());
        let (id, content) = upload(&router, "panel survey").await;

        let (status, _) = post_json(
            &router,
            "/data/compare-and-put",
            serde_json::json!({
                "org": "WS1",
                "ownerOrg": "IntageMSP",
                "contentId": id,
                "content": content,
                "buyer": "WS1",
                "seller": "Intage",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = get(&router, &format!("/data/WS1MSP/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = GatewayError::Conflict {
            tx_id: "t".into(),
            key: "erc20/WS1".into(),
        };
        assert_eq!(status_for(&err), StatusCode::CONFLICT);
        let err = GatewayError::Rejected {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
