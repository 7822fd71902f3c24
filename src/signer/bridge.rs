//! JSON-RPC client for a local wallet bridge.
//!
//! The bridge relays wallet-extension calls over HTTP:
//! `POST {bridge_url}/rpc` with `{ "jsonrpc": "2.0", "id", "method", "params" }`, answered by
//! `{ "result": ... }` or `{ "error": { "code", "message" } }`. `GET {bridge_url}/health`
//! is the presence probe.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::signer::types::{MessageSignature, ProviderFault, SignTransactionCall, SignerError};
use crate::signer::{CallShape, SigningProvider};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Provider backed by a wallet bridge process.
#[derive(Clone)]
pub struct BridgeProvider {
    client: Client,
    base_url: Url,
}

impl BridgeProvider {
    /// Create a bridge client for `bridge_url`.
    pub fn new(bridge_url: &str) -> Result<Self, SignerError> {
        let base_url: Url = bridge_url.parse().map_err(|e| {
            SignerError::ProviderUnavailable(format!("Invalid bridge URL '{}': {}", bridge_url, e))
        })?;
        let client = Client::builder()
            .build()
            .map_err(|e| SignerError::ProviderUnavailable(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ProviderFault> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });

        let res = self
            .client
            .post(self.endpoint("rpc"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderFault::Unreachable(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ProviderFault::Unreachable(e.to_string()))?;

        match serde_json::from_str::<RpcResponse>(&text) {
            Ok(RpcResponse {
                error: Some(err), ..
            }) => Err(ProviderFault::Rejected {
                code: err.code,
                message: err.message,
            }),
            Ok(RpcResponse {
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Ok(_) if status.is_success() => Ok(Value::Null),
            _ => Err(ProviderFault::Rejected {
                code: Some(i64::from(status.as_u16())),
                message: format!("bridge returned {}: {}", status, text),
            }),
        }
    }
}

/// Pull a string out of either a bare string result or an object field.
fn string_result(value: &Value, fields: &[&str]) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => fields
            .iter()
            .find_map(|f| map.get(*f).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl SigningProvider for BridgeProvider {
    fn name(&self) -> &str {
        "wallet-bridge"
    }

    fn endpoint_host(&self) -> Option<String> {
        self.base_url.host_str().map(str::to_string)
    }

    async fn probe(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Wallet bridge probe failed");
                false
            }
        }
    }

    async fn request_public_key(&self) -> Result<Option<String>, ProviderFault> {
        let result = self.rpc("requestAccess", json!({})).await?;
        Ok(string_result(&result, &["address", "publicKey"]))
    }

    async fn authorized_public_key(&self) -> Result<Option<String>, ProviderFault> {
        let result = self.rpc("getPublicKey", json!({})).await?;
        Ok(string_result(&result, &["address", "publicKey"]))
    }

    async fn network_passphrase(&self) -> Result<Option<String>, ProviderFault> {
        let result = self.rpc("getNetworkDetails", json!({})).await?;
        Ok(string_result(&result, &["networkPassphrase"]))
    }

    async fn sign_message(&self, message: &str) -> Result<MessageSignature, ProviderFault> {
        let result = self.rpc("signMessage", json!([message])).await?;
        match result {
            Value::String(signature) => Ok(MessageSignature {
                signature,
                signer: None,
            }),
            other => serde_json::from_value(other).map_err(|e| ProviderFault::Rejected {
                code: None,
                message: format!("malformed signMessage result: {}", e),
            }),
        }
    }

    async fn sign_transaction(&self, call: SignTransactionCall) -> Result<String, ProviderFault> {
        let params = match call.shape {
            CallShape::Positional => json!([call.xdr, call.network_passphrase]),
            CallShape::Options => json!({
                "xdr": call.xdr,
                "networkPassphrase": call.network_passphrase,
            }),
        };
        let result = self.rpc("signTransaction", params).await?;
        string_result(&result, &["signedTxXdr", "signedXdr", "xdr"]).ok_or_else(|| {
            ProviderFault::Rejected {
                code: None,
                message: "signTransaction returned no payload".to_string(),
            }
        })
    }
}

impl std::fmt::Debug for BridgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeProvider")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}
