//! Horizon REST client for account balance lookups.
//!
//! # Responsibilities
//! - Query an account's native-asset balance
//! - Handle timeouts and network errors gracefully
//! - Provide a health check for ledger connectivity

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::ledger::types::{AccountRecord, Balance, LedgerError, LedgerResult};
use crate::resilience::with_deadline;

/// Read-only ledger queries.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Native-asset balance of `account`, formatted for display.
    async fn native_balance(&self, account: &str) -> LedgerResult<Balance>;
}

/// `LedgerQuery` over a Horizon-style REST API.
#[derive(Clone)]
pub struct HorizonClient {
    client: Client,
    base_url: Url,
    timeout_duration: Duration,
}

impl HorizonClient {
    /// Create a new ledger client.
    ///
    /// # Arguments
    /// * `ledger_url` - Horizon base URL
    /// * `timeout_duration` - Per-request deadline
    pub fn new(ledger_url: &str, timeout_duration: Duration) -> LedgerResult<Self> {
        let base_url: Url = ledger_url.parse().map_err(|e| {
            LedgerError::Request(format!("Invalid ledger URL '{}': {}", ledger_url, e))
        })?;
        let client = Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(|e| LedgerError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            timeout_duration,
        })
    }

    fn account_url(&self, account: &str) -> String {
        format!(
            "{}/accounts/{}",
            self.base_url.as_str().trim_end_matches('/'),
            account
        )
    }

    async fn fetch_account(&self, account: &str) -> LedgerResult<AccountRecord> {
        let fut = async {
            let res = self
                .client
                .get(self.account_url(account))
                .send()
                .await
                .map_err(|e| LedgerError::Request(e.to_string()))?;

            match res.status() {
                s if s.is_success() => res
                    .json::<AccountRecord>()
                    .await
                    .map_err(|e| LedgerError::Malformed(e.to_string())),
                StatusCode::NOT_FOUND => Err(LedgerError::AccountNotFound(account.to_string())),
                s => Err(LedgerError::Request(format!("ledger returned {}", s))),
            }
        };

        with_deadline(self.timeout_duration, fut, LedgerError::Timeout).await
    }

    /// Check if the ledger is reachable.
    pub async fn is_healthy(&self) -> bool {
        let fut = async {
            self.client
                .get(self.base_url.as_str())
                .send()
                .await
                .map_err(|e| LedgerError::Request(e.to_string()))
        };
        matches!(
            with_deadline(self.timeout_duration, fut, LedgerError::Timeout).await,
            Ok(res) if res.status().is_success()
        )
    }
}

#[async_trait]
impl LedgerQuery for HorizonClient {
    async fn native_balance(&self, account: &str) -> LedgerResult<Balance> {
        let record = self.fetch_account(account).await?;
        let raw = record
            .native_balance()
            .ok_or_else(|| LedgerError::Malformed("account has no native balance line".to_string()))?;
        Balance::from_raw(raw)
    }
}

impl std::fmt::Debug for HorizonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HorizonClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
