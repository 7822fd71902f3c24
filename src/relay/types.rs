//! Relay wire types and error definitions.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::proposals::{Proposal, ProposalStatus, SignatureRecord};

/// Errors that can occur during relay operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Relay unreachable, timed out, or answered with something other than an envelope.
    #[error("relay request failed: {0}")]
    Network(String),

    /// Relay answered `ok: false`; carries its error text verbatim.
    #[error("relay rejected request: {0}")]
    Rejected(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Network(_) => ErrorKind::NetworkError,
            RelayError::Rejected(_) => ErrorKind::RelayRejected,
        }
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Calls into the custody contract that the relay knows how to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// Open a custody account owned by `owner`.
    CreateCustodyAccount {
        owner: String,
        required_signatures: u32,
        insurance: bool,
    },
    DepositAssets {
        owner: String,
        amount: u64,
    },
    WithdrawAssets {
        owner: String,
        amount: u64,
        signatures_count: u32,
    },
}

impl ContractCall {
    /// Contract function name.
    pub fn function(&self) -> &'static str {
        match self {
            ContractCall::CreateCustodyAccount { .. } => "create_custody_account",
            ContractCall::DepositAssets { .. } => "deposit_assets",
            ContractCall::WithdrawAssets { .. } => "withdraw_assets",
        }
    }

    /// Named arguments for the contract function.
    pub fn params(&self) -> Value {
        match self {
            ContractCall::CreateCustodyAccount {
                owner,
                required_signatures,
                insurance,
            } => json!({
                "owner": owner,
                "required_signatures": required_signatures,
                "insurance": insurance,
            }),
            ContractCall::DepositAssets { owner, amount } => json!({
                "owner": owner,
                "amount": amount,
            }),
            ContractCall::WithdrawAssets {
                owner,
                amount,
                signatures_count,
            } => json!({
                "owner": owner,
                "amount": amount,
                "signatures_count": signatures_count,
            }),
        }
    }
}

/// `{ ok, xdr?, tx_hash?, error? }` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub xdr: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Turn a raw HTTP response into an accepted envelope or a typed error.
///
/// Any `ok != true` envelope is a rejection regardless of status; a non-2xx response
/// without an envelope is a network failure.
pub(crate) fn interpret(status: StatusCode, body: &str) -> RelayResult<Envelope> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(env) if !env.ok => Err(RelayError::Rejected(
            env.error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "relay refused the request".to_string()),
        )),
        Ok(env) if status.is_success() => Ok(env),
        Ok(_) => Err(RelayError::Network(format!(
            "relay returned {} with an ok envelope",
            status
        ))),
        Err(_) if status.is_success() => Err(RelayError::Network(format!(
            "undecodable relay response: {}",
            truncate(body)
        ))),
        Err(_) => Err(RelayError::Network(format!(
            "relay returned {}: {}",
            status,
            truncate(body)
        ))),
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Signature element: a bare signature string or a `{ signer, signature }` record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignatureWire {
    Bare(String),
    Full {
        #[serde(alias = "key")]
        signer: String,
        signature: String,
    },
}

/// Proposal record as served by `GET /proposals`.
#[derive(Debug, Deserialize)]
struct ProposalRecord {
    id: Value,
    owner: String,
    required_signatures: u32,
    #[serde(default)]
    insurance: bool,
    status: String,
    #[serde(default)]
    signatures: Vec<SignatureWire>,
}

/// Decode one proposal record, refusing records that cannot be trusted.
pub(crate) fn decode_proposal(value: Value) -> Result<Proposal, String> {
    let record: ProposalRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let id = match record.id {
        Value::String(s) if !s.trim().is_empty() => s,
        Value::Number(n) => n.to_string(),
        other => return Err(format!("unusable proposal id: {}", other)),
    };
    if record.required_signatures == 0 {
        return Err(format!("proposal {} has required_signatures = 0", id));
    }
    let status = ProposalStatus::from_label(&record.status)
        .ok_or_else(|| format!("proposal {} has unknown status '{}'", id, record.status))?;

    let signatures = record
        .signatures
        .into_iter()
        .map(|s| match s {
            SignatureWire::Bare(signature) => SignatureRecord {
                signer: None,
                signature,
            },
            SignatureWire::Full { signer, signature } => SignatureRecord {
                signer: Some(signer),
                signature,
            },
        })
        .collect();

    Ok(Proposal {
        id,
        owner: record.owner,
        required_signatures: record.required_signatures,
        insurance_enabled: record.insurance,
        signatures,
        status,
    })
}
