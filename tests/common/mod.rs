//! Shared harness for integration tests: mock relay, wallet bridge and ledger on
//! ephemeral ports, with call counters.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use custody_orchestrator::config::CustodyConfig;

pub const TESTNET: &str = "Test SDF Network ; September 2015";
pub const ADMIN: &str = "GADMINAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const SIGNER_X: &str = "GSIGNERXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";

/// Serve `router` on an ephemeral loopback port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Configuration pointing at the mock endpoints with short timeouts.
pub fn config(relay: &str, bridge: &str, ledger: &str, admin: Option<&str>) -> CustodyConfig {
    let mut config = CustodyConfig::default();
    config.relay.base_url = relay.to_string();
    config.signer.bridge_url = bridge.to_string();
    config.ledger.url = ledger.to_string();
    config.admin.identity = admin.map(str::to_string);
    config.network.passphrase = TESTNET.to_string();
    config.timeouts.relay_secs = 2;
    config.timeouts.ledger_secs = 2;
    config.timeouts.signer_secs = 2;
    config.timeouts.probe_ms = 500;
    config
}

pub fn proposal(id: &str, owner: &str, required: u32, status: &str, signatures: &[&str]) -> Value {
    json!({
        "id": id,
        "owner": owner,
        "required_signatures": required,
        "insurance": true,
        "status": status,
        "signatures": signatures,
    })
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Scripted relay state.
pub struct MockRelay {
    pub proposals: Mutex<Value>,
    pub build_response: Mutex<(StatusCode, Value)>,
    pub withdraw_response: Mutex<(StatusCode, Value)>,
    pub submit_response: Mutex<(StatusCode, Value)>,
    pub sign_response: Mutex<(StatusCode, Value)>,
    /// Delay applied to every response.
    pub delay: Mutex<Duration>,

    pub list_calls: AtomicUsize,
    pub build_calls: AtomicUsize,
    pub withdraw_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,

    pub builds: Mutex<Vec<Value>>,
    pub submits: Mutex<Vec<Value>>,
    pub signs: Mutex<Vec<(String, Value)>>,
    pub request_ids: Mutex<Vec<String>>,
}

impl Default for MockRelay {
    fn default() -> Self {
        Self {
            proposals: Mutex::new(json!([])),
            build_response: Mutex::new((StatusCode::OK, json!({"ok": true, "xdr": "UNSIGNED"}))),
            withdraw_response: Mutex::new((
                StatusCode::OK,
                json!({"ok": true, "xdr": "UNSIGNED_WITHDRAW"}),
            )),
            submit_response: Mutex::new((StatusCode::OK, json!({"ok": true, "tx_hash": "HASH"}))),
            sign_response: Mutex::new((StatusCode::OK, json!({"ok": true}))),
            delay: Mutex::new(Duration::ZERO),
            list_calls: AtomicUsize::new(0),
            build_calls: AtomicUsize::new(0),
            withdraw_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            builds: Mutex::new(Vec::new()),
            submits: Mutex::new(Vec::new()),
            signs: Mutex::new(Vec::new()),
            request_ids: Mutex::new(Vec::new()),
        }
    }
}

impl MockRelay {
    pub fn set_proposals(&self, proposals: Value) {
        *self.proposals.lock().unwrap() = proposals;
    }

    pub fn set_build(&self, status: StatusCode, body: Value) {
        *self.build_response.lock().unwrap() = (status, body);
    }

    pub fn set_submit(&self, status: StatusCode, body: Value) {
        *self.submit_response.lock().unwrap() = (status, body);
    }

    pub fn set_sign(&self, status: StatusCode, body: Value) {
        *self.sign_response.lock().unwrap() = (status, body);
    }

    /// Calls that change relay state or build transactions.
    pub fn write_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
            + self.withdraw_calls.load(Ordering::SeqCst)
            + self.submit_calls.load(Ordering::SeqCst)
            + self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn note_request(&self, headers: &HeaderMap) {
        if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            self.request_ids.lock().unwrap().push(id.to_string());
        }
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn reply((status, body): (StatusCode, Value)) -> Response {
    (status, Json(body)).into_response()
}

async fn relay_list(State(relay): State<Arc<MockRelay>>, headers: HeaderMap) -> Response {
    relay.note_request(&headers);
    relay.list_calls.fetch_add(1, Ordering::SeqCst);
    relay.pause().await;
    let proposals = relay.proposals.lock().unwrap().clone();
    Json(proposals).into_response()
}

async fn relay_build(
    State(relay): State<Arc<MockRelay>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    relay.note_request(&headers);
    relay.build_calls.fetch_add(1, Ordering::SeqCst);
    relay.builds.lock().unwrap().push(body);
    relay.pause().await;
    let response = relay.build_response.lock().unwrap().clone();
    reply(response)
}

async fn relay_withdraw(
    State(relay): State<Arc<MockRelay>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    relay.note_request(&headers);
    relay.withdraw_calls.fetch_add(1, Ordering::SeqCst);
    relay.builds.lock().unwrap().push(json!({ "withdraw_execute": id }));
    relay.pause().await;
    let response = relay.withdraw_response.lock().unwrap().clone();
    reply(response)
}

async fn relay_submit(
    State(relay): State<Arc<MockRelay>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    relay.note_request(&headers);
    relay.submit_calls.fetch_add(1, Ordering::SeqCst);
    relay.submits.lock().unwrap().push(body);
    relay.pause().await;
    let response = relay.submit_response.lock().unwrap().clone();
    reply(response)
}

async fn relay_sign(
    State(relay): State<Arc<MockRelay>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    relay.note_request(&headers);
    relay.sign_calls.fetch_add(1, Ordering::SeqCst);
    relay.signs.lock().unwrap().push((id, body));
    relay.pause().await;
    let response = relay.sign_response.lock().unwrap().clone();
    reply(response)
}

/// Start a mock relay; returns its base URL and state handle.
pub async fn start_relay() -> (String, Arc<MockRelay>) {
    let state = Arc::new(MockRelay::default());
    let router = Router::new()
        .route("/proposals", get(relay_list))
        .route("/proposals/{id}/sign", post(relay_sign))
        .route("/build_tx", post(relay_build))
        .route("/submit_tx", post(relay_submit))
        .route("/withdraw_execute/{id}", post(relay_withdraw))
        .with_state(state.clone());
    (serve(router).await, state)
}

// ---------------------------------------------------------------------------
// Wallet bridge
// ---------------------------------------------------------------------------

/// Scripted wallet behind the bridge.
pub struct MockWallet {
    pub key: Mutex<Option<String>>,
    /// Whether `getPublicKey` (silent) returns the key.
    pub authorized: Mutex<bool>,
    /// `"positional"`, `"options"` or `"any"`.
    pub accepts_shape: Mutex<&'static str>,
    pub signed_payload: Mutex<String>,
    pub network: Mutex<String>,
    /// When set, every signing call is declined with code 4001.
    pub decline: Mutex<bool>,

    pub access_calls: AtomicUsize,
    pub message_calls: AtomicUsize,
    pub tx_calls: AtomicUsize,
    pub messages: Mutex<Vec<String>>,
    pub tx_params: Mutex<Vec<Value>>,
}

impl MockWallet {
    pub fn new(key: &str) -> Self {
        Self {
            key: Mutex::new(Some(key.to_string())),
            authorized: Mutex::new(true),
            accepts_shape: Mutex::new("any"),
            signed_payload: Mutex::new("SIGNED".to_string()),
            network: Mutex::new(TESTNET.to_string()),
            decline: Mutex::new(false),
            access_calls: AtomicUsize::new(0),
            message_calls: AtomicUsize::new(0),
            tx_calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            tx_params: Mutex::new(Vec::new()),
        }
    }

    /// Provider calls that sign something.
    pub fn signing_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst) + self.tx_calls.load(Ordering::SeqCst)
    }

    fn sign_tx(&self, params: &Value) -> Result<Value, (i64, String)> {
        self.tx_calls.fetch_add(1, Ordering::SeqCst);
        self.tx_params.lock().unwrap().push(params.clone());
        if *self.decline.lock().unwrap() {
            return Err((4001, "User declined access".to_string()));
        }
        let shape = if params.is_array() { "positional" } else { "options" };
        let accepts = *self.accepts_shape.lock().unwrap();
        if accepts != "any" && accepts != shape {
            return Err((-32602, "Invalid params".to_string()));
        }
        Ok(json!({ "signedTxXdr": self.signed_payload.lock().unwrap().clone() }))
    }
}

async fn bridge_health() -> StatusCode {
    StatusCode::OK
}

async fn bridge_rpc(State(wallet): State<Arc<MockWallet>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let params = req["params"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();

    let outcome: Result<Value, (i64, String)> = match method.as_str() {
        "requestAccess" => {
            wallet.access_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(wallet.key.lock().unwrap().clone().unwrap_or_default()))
        }
        "getPublicKey" => {
            if *wallet.authorized.lock().unwrap() {
                Ok(json!(wallet.key.lock().unwrap().clone().unwrap_or_default()))
            } else {
                Ok(json!(""))
            }
        }
        "getNetworkDetails" => Ok(json!({
            "network": "TESTNET",
            "networkPassphrase": wallet.network.lock().unwrap().clone(),
        })),
        "signMessage" => {
            wallet.message_calls.fetch_add(1, Ordering::SeqCst);
            let message = params[0].as_str().unwrap_or_default().to_string();
            wallet.messages.lock().unwrap().push(message.clone());
            if *wallet.decline.lock().unwrap() {
                Err((4001, "User declined access".to_string()))
            } else {
                Ok(json!({
                    "signature": format!("sig:{}", message),
                    "signerAddress": wallet.key.lock().unwrap().clone(),
                }))
            }
        }
        "signTransaction" => wallet.sign_tx(&params),
        other => Err((-32601, format!("method not found: {}", other))),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => {
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
        }
    })
}

/// Start a mock wallet bridge for `wallet`; returns its base URL.
pub async fn start_bridge(wallet: Arc<MockWallet>) -> String {
    let router = Router::new()
        .route("/health", get(bridge_health))
        .route("/rpc", post(bridge_rpc))
        .with_state(wallet);
    serve(router).await
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

async fn ledger_account(Path(id): Path<String>) -> Response {
    if id.starts_with("GUNFUNDED") {
        return (StatusCode::NOT_FOUND, Json(json!({"status": 404}))).into_response();
    }
    Json(json!({
        "id": id,
        "balances": [
            { "asset_type": "credit_alphanum4", "asset_code": "USDC", "balance": "1.0000000" },
            { "asset_type": "native", "balance": "123.4567890" }
        ]
    }))
    .into_response()
}

/// Start a mock Horizon ledger; returns its base URL.
pub async fn start_ledger() -> String {
    let router = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/accounts/{id}", get(ledger_account));
    serve(router).await
}

/// Every mock running, for scenario tests.
pub struct World {
    pub relay_url: String,
    pub relay: Arc<MockRelay>,
    pub bridge_url: String,
    pub wallet: Arc<MockWallet>,
    pub ledger_url: String,
}

impl World {
    pub async fn start(wallet_key: &str) -> Self {
        let (relay_url, relay) = start_relay().await;
        let wallet = Arc::new(MockWallet::new(wallet_key));
        let bridge_url = start_bridge(wallet.clone()).await;
        let ledger_url = start_ledger().await;
        Self {
            relay_url,
            relay,
            bridge_url,
            wallet,
            ledger_url,
        }
    }

    pub fn config(&self, admin: Option<&str>) -> CustodyConfig {
        config(&self.relay_url, &self.bridge_url, &self.ledger_url, admin)
    }
}
