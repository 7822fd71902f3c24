//! Ledger query types and error definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during ledger queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Request failed or the ledger answered non-2xx.
    #[error("ledger request failed: {0}")]
    Request(String),

    /// Request timed out.
    #[error("ledger timeout after {0:?}")]
    Timeout(Duration),

    /// The account does not exist on the ledger.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The response could not be decoded.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NetworkError
    }
}

/// Result type for ledger queries.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Advisory native-asset balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    /// Two-decimal display string.
    Native(String),
    Unavailable,
}

impl Balance {
    /// Format a raw ledger amount (e.g. `"123.4567890"`) for display.
    pub fn from_raw(raw: &str) -> LedgerResult<Self> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| LedgerError::Malformed(format!("balance '{}' is not a number", raw)))?;
        if !value.is_finite() {
            return Err(LedgerError::Malformed(format!("balance '{}' is not finite", raw)));
        }
        Ok(Balance::Native(format!("{:.2}", value)))
    }
}

impl std::fmt::Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Balance::Native(amount) => write!(f, "{}", amount),
            Balance::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// `GET /accounts/{id}` response, reduced to what we read.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountRecord {
    #[serde(default)]
    pub balances: Vec<BalanceLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BalanceLine {
    pub asset_type: String,
    pub balance: String,
}

impl AccountRecord {
    pub fn native_balance(&self) -> Option<&str> {
        self.balances
            .iter()
            .find(|b| b.asset_type == "native")
            .map(|b| b.balance.as_str())
    }
}
