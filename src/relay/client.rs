//! HTTP client for the custody relay.
//!
//! # Responsibilities
//! - Fetch the proposal collection
//! - Ask the relay to build unsigned transactions
//! - Submit signed transactions and approval signatures
//! - Bound every call with a timeout and tag it with a request id

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::observability::{abbreviate, metrics};
use crate::proposals::Proposal;
use crate::relay::types::{decode_proposal, interpret, Envelope, RelayError, RelayResult};
use crate::resilience::with_deadline;

/// Relay operations the orchestrator depends on.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Full proposal collection in relay order.
    async fn list_proposals(&self) -> RelayResult<Vec<Proposal>>;

    /// Build an unsigned transaction for a contract function call.
    async fn build_unsigned_transaction(&self, function: &str, params: Value)
        -> RelayResult<String>;

    /// Build the withdrawal transaction for a Ready proposal.
    async fn build_withdrawal(&self, proposal_id: &str) -> RelayResult<String>;

    /// Record one approval signature against a proposal.
    async fn submit_approval_signature(
        &self,
        proposal_id: &str,
        signer: &str,
        signature: &str,
    ) -> RelayResult<()>;

    /// Broadcast a signed transaction; returns its hash.
    async fn submit_signed_transaction(&self, signed_payload: &str) -> RelayResult<String>;
}

/// `RelayClient` over the relay's HTTP JSON API.
#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpRelayClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> RelayResult<Self> {
        let base_url: Url = base_url.parse().map_err(|e| {
            RelayError::Network(format!("Invalid relay URL '{}': {}", base_url, e))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> RelayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RelayError::Network(format!("relay URL '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request and return the status and body text.
    async fn send(
        &self,
        op: &'static str,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> RelayResult<(StatusCode, String)> {
        let url = self.endpoint(segments)?;
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(request_id = %request_id, op, path = url.path(), "Relay request");

        let mut req = self
            .client
            .request(method, url)
            .header("x-request-id", &request_id);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let exchange = async {
            let res = req
                .send()
                .await
                .map_err(|e| RelayError::Network(e.to_string()))?;
            let status = res.status();
            let text = res
                .text()
                .await
                .map_err(|e| RelayError::Network(e.to_string()))?;
            Ok::<_, RelayError>((status, text))
        };

        let result = with_deadline(self.timeout, exchange, |d| {
            RelayError::Network(format!("relay timed out after {:?}", d))
        })
        .await;

        match &result {
            Ok((status, _)) => {
                tracing::debug!(request_id = %request_id, op, status = status.as_u16(), "Relay response");
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, op, error = %e, "Relay request failed");
            }
        }
        result
    }

    /// Send a request and require an accepted envelope.
    async fn envelope(
        &self,
        op: &'static str,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> RelayResult<Envelope> {
        let result = match self.send(op, method, segments, body).await {
            Ok((status, text)) => interpret(status, &text),
            Err(e) => Err(e),
        };
        record(op, &result);
        result
    }
}

fn record<T>(op: &'static str, result: &RelayResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(RelayError::Rejected(_)) => "rejected",
        Err(RelayError::Network(_)) => "error",
    };
    metrics::record_relay_request(op, outcome);
}

fn require(field: &str, value: Option<String>) -> RelayResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RelayError::Network(format!("relay accepted the request but sent no {}", field)))
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn list_proposals(&self) -> RelayResult<Vec<Proposal>> {
        let op = "list_proposals";
        let result = async {
            let (status, text) = self.send(op, Method::GET, &["proposals"], None).await?;
            if !status.is_success() {
                return interpret(status, &text).map(|_| Vec::new());
            }
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| RelayError::Network(format!("undecodable proposal list: {}", e)))?;
            let Value::Array(records) = value else {
                return Err(RelayError::Network(
                    "proposal list is not an array".to_string(),
                ));
            };

            let mut proposals = Vec::with_capacity(records.len());
            for record in records {
                match decode_proposal(record) {
                    Ok(p) => proposals.push(p),
                    Err(reason) => {
                        tracing::warn!(reason = %reason, "Skipping malformed proposal record");
                    }
                }
            }
            Ok(proposals)
        }
        .await;
        record(op, &result);
        result
    }

    async fn build_unsigned_transaction(
        &self,
        function: &str,
        params: Value,
    ) -> RelayResult<String> {
        let body = json!({ "function": function, "params": params });
        let env = self
            .envelope("build_tx", Method::POST, &["build_tx"], Some(body))
            .await?;
        require("xdr", env.xdr)
    }

    async fn build_withdrawal(&self, proposal_id: &str) -> RelayResult<String> {
        let env = self
            .envelope(
                "withdraw_execute",
                Method::POST,
                &["withdraw_execute", proposal_id],
                None,
            )
            .await?;
        require("xdr", env.xdr)
    }

    async fn submit_approval_signature(
        &self,
        proposal_id: &str,
        signer: &str,
        signature: &str,
    ) -> RelayResult<()> {
        let op = "sign_proposal";
        let body = json!({ "signer": signer, "signature": signature });
        tracing::debug!(
            proposal_id,
            signer = %abbreviate(signer),
            signature = %abbreviate(signature),
            "Submitting approval"
        );

        let segments = ["proposals", proposal_id, "sign"];
        let result = match self.send(op, Method::POST, &segments, Some(body)).await {
            Ok((status, text)) => interpret_ack(status, &text),
            Err(e) => Err(e),
        };
        record(op, &result);
        result
    }

    async fn submit_signed_transaction(&self, signed_payload: &str) -> RelayResult<String> {
        let body = json!({ "signed_xdr": signed_payload });
        let env = self
            .envelope("submit_tx", Method::POST, &["submit_tx"], Some(body))
            .await?;
        require("tx_hash", env.tx_hash)
    }
}

/// Acknowledgement of an approval.
///
/// Besides the `{ ok }` envelope, older relays answer with the updated proposal record on
/// success and `null` when the id is unknown.
fn interpret_ack(status: StatusCode, text: &str) -> RelayResult<()> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) if map.contains_key("ok") => interpret(status, text).map(|_| ()),
        Ok(Value::Object(_)) if status.is_success() => Ok(()),
        Ok(Value::Null) if status.is_success() => {
            Err(RelayError::Rejected("proposal not found".to_string()))
        }
        _ => interpret(status, text).map(|_| ()),
    }
}

impl std::fmt::Debug for HttpRelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRelayClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
