//! Wallet connection state machine.
//!
//! # Responsibilities
//! - Drive the connection lifecycle: Checking → Connected | Disconnected | Error
//! - Derive the caller's role whenever the identity changes
//! - Best-effort advisory balance lookup
//! - Publish every change as one atomic snapshot
//!
//! # Design Decisions
//! - State lives in a `tokio::sync::watch` channel; readers never observe an identity
//!   without the role derived from it
//! - Each identity change bumps `epoch`; results computed for an older epoch are dropped

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::ledger::{Balance, LedgerQuery};
use crate::observability::abbreviate;
use crate::session::role::Role;
use crate::signer::{SignerAdapter, SignerError, SignerResult};

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Checking,
    Disconnected,
    Connected,
    Error,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: ConnectionPhase,
    pub identity: Option<String>,
    /// Derived from `identity`; `None` while unauthenticated.
    pub role: Option<Role>,
    /// Advisory; `None` until fetched.
    pub balance: Option<Balance>,
    pub last_error: Option<String>,
    /// Incremented on every identity change.
    pub epoch: u64,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            phase: ConnectionPhase::Checking,
            identity: None,
            role: None,
            balance: None,
            last_error: None,
            epoch: 0,
        }
    }

    /// Identity and role together, if connected.
    pub fn actor(&self) -> Option<(String, Role)> {
        match (&self.identity, self.role) {
            (Some(identity), Some(role)) if self.phase == ConnectionPhase::Connected => {
                Some((identity.clone(), role))
            }
            _ => None,
        }
    }
}

/// Process-wide session container, shared by `Arc` from the composition point.
pub struct Session {
    signer: Arc<SignerAdapter>,
    ledger: Option<Arc<dyn LedgerQuery>>,
    admin_identity: Option<String>,
    auto_connect_local_only: bool,
    state: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(
        signer: Arc<SignerAdapter>,
        ledger: Option<Arc<dyn LedgerQuery>>,
        admin_identity: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Self {
            signer,
            ledger,
            admin_identity: admin_identity.filter(|a| !a.trim().is_empty()),
            auto_connect_local_only: false,
            state,
        }
    }

    /// Only auto-connect when the signer is reached over a loopback host.
    pub fn with_auto_connect_local_only(mut self, enabled: bool) -> Self {
        self.auto_connect_local_only = enabled;
        self
    }

    pub fn signer(&self) -> &Arc<SignerAdapter> {
        &self.signer
    }

    fn admin_identity(&self) -> Option<&str> {
        self.admin_identity.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Connected identity and its role.
    pub fn actor(&self) -> Option<(String, Role)> {
        self.state.borrow().actor()
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Whether a signing provider is present. No side effects.
    pub async fn check_provider_available(&self) -> bool {
        self.signer.is_available().await
    }

    /// Interactive connect: may prompt the user through the provider.
    pub async fn connect(&self) -> SignerResult<String> {
        self.state.send_modify(|s| {
            s.phase = ConnectionPhase::Checking;
            s.last_error = None;
        });

        match self.obtain_identity().await {
            Ok(identity) => {
                let epoch = self.set_connected(&identity);
                tracing::info!(
                    identity = %abbreviate(&identity),
                    role = %Role::derive(&identity, self.admin_identity()),
                    "Wallet connected"
                );
                self.load_balance(&identity, epoch).await;
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection failed");
                self.set_unauthenticated(ConnectionPhase::Error, Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn obtain_identity(&self) -> SignerResult<String> {
        if !self.signer.is_available().await {
            return Err(SignerError::ProviderUnavailable(
                "signing provider not detected".to_string(),
            ));
        }
        self.signer.get_identity().await
    }

    /// Silent connect at startup; never prompts and never enters `Error`.
    pub async fn auto_connect(&self) -> Option<String> {
        self.state.send_modify(|s| s.phase = ConnectionPhase::Checking);

        if self.auto_connect_local_only && !self.provider_is_local() {
            tracing::info!(
                host = ?self.signer.provider_host(),
                "Signer is not on a loopback host, skipping auto-connect"
            );
            self.set_unauthenticated(ConnectionPhase::Disconnected, None);
            return None;
        }

        let identity = if self.signer.is_available().await {
            match self.signer.authorized_identity().await {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::debug!(error = %e, "Auto-connect found no authorized identity");
                    None
                }
            }
        } else {
            None
        };

        match identity {
            Some(identity) => {
                let epoch = self.set_connected(&identity);
                tracing::info!(identity = %abbreviate(&identity), "Wallet auto-connected");
                self.load_balance(&identity, epoch).await;
                Some(identity)
            }
            None => {
                self.set_unauthenticated(ConnectionPhase::Disconnected, None);
                None
            }
        }
    }

    /// Forget the identity and balance.
    pub fn disconnect(&self) {
        self.set_unauthenticated(ConnectionPhase::Disconnected, None);
        tracing::info!("Wallet disconnected");
    }

    /// Re-fetch the advisory balance for the connected identity.
    pub async fn refresh_balance(&self) -> Option<Balance> {
        let (identity, _) = self.actor()?;
        let epoch = self.epoch();
        Some(self.load_balance(&identity, epoch).await)
    }

    fn provider_is_local(&self) -> bool {
        match self.signer.provider_host() {
            None => true,
            Some(host) => is_loopback_host(&host),
        }
    }

    fn set_connected(&self, identity: &str) -> u64 {
        let role = Role::derive(identity, self.admin_identity());
        let mut epoch = 0;
        self.state.send_modify(|s| {
            if s.identity.as_deref() != Some(identity) {
                s.epoch += 1;
                s.balance = None;
            }
            s.phase = ConnectionPhase::Connected;
            s.identity = Some(identity.to_string());
            s.role = Some(role);
            s.last_error = None;
            epoch = s.epoch;
        });
        epoch
    }

    fn set_unauthenticated(&self, phase: ConnectionPhase, error: Option<String>) {
        self.state.send_modify(|s| {
            if s.identity.is_some() {
                s.epoch += 1;
            }
            s.phase = phase;
            s.identity = None;
            s.role = None;
            s.balance = None;
            s.last_error = error;
        });
    }

    async fn load_balance(&self, identity: &str, epoch: u64) -> Balance {
        let balance = match &self.ledger {
            Some(ledger) => match ledger.native_balance(identity).await {
                Ok(balance) => balance,
                Err(e) => {
                    tracing::warn!(identity = %abbreviate(identity), error = %e, "Balance lookup failed");
                    Balance::Unavailable
                }
            },
            None => Balance::Unavailable,
        };

        let applied = self.state.send_if_modified(|s| {
            if s.epoch != epoch || s.identity.as_deref() != Some(identity) {
                return false;
            }
            s.balance = Some(balance.clone());
            true
        });
        if !applied {
            tracing::debug!(epoch, "Dropping balance for a superseded session");
        }
        balance
    }
}

fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .field("auto_connect_local_only", &self.auto_connect_local_only)
            .finish()
    }
}
