//! Startup and composition.
//!
//! # Responsibilities
//! - Build every subsystem from a validated configuration
//! - Wire session, repository and orchestrator together at one point
//! - Attempt a silent wallet reconnect and an initial refresh
//!
//! # Design Decisions
//! - Fail fast on unusable endpoints; never fail on an absent wallet
//! - Collaborators are injectable so tests can substitute in-memory mocks

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::CustodyConfig;
use crate::ledger::{HorizonClient, LedgerError, LedgerQuery};
use crate::observability::abbreviate;
use crate::orchestrator::Orchestrator;
use crate::proposals::ProposalRepository;
use crate::relay::{HttpRelayClient, RelayClient, RelayError};
use crate::session::Session;
use crate::signer::{BridgeProvider, NetworkContext, SignerAdapter, SignerError, SigningProvider};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("relay client: {0}")]
    Relay(#[from] RelayError),

    #[error("ledger client: {0}")]
    Ledger(#[from] LedgerError),

    #[error("signer bridge: {0}")]
    Signer(#[from] SignerError),
}

/// External collaborators the core talks to.
pub struct Collaborators {
    /// `None` models "no wallet installed".
    pub provider: Option<Arc<dyn SigningProvider>>,
    pub relay: Arc<dyn RelayClient>,
    pub ledger: Option<Arc<dyn LedgerQuery>>,
}

impl Collaborators {
    /// HTTP-backed collaborators for the configured endpoints.
    pub fn from_config(config: &CustodyConfig) -> Result<Self, StartupError> {
        let relay = HttpRelayClient::new(
            &config.relay.base_url,
            Duration::from_secs(config.timeouts.relay_secs),
        )?;
        let ledger = HorizonClient::new(
            &config.ledger.url,
            Duration::from_secs(config.timeouts.ledger_secs),
        )?;
        let provider = BridgeProvider::new(&config.signer.bridge_url)?;

        Ok(Self {
            provider: Some(Arc::new(provider)),
            relay: Arc::new(relay),
            ledger: Some(Arc::new(ledger)),
        })
    }
}

/// The assembled client core.
pub struct Custody {
    pub config: CustodyConfig,
    pub session: Arc<Session>,
    pub repository: Arc<ProposalRepository>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Custody {
    /// Wire the core over the given collaborators.
    pub fn assemble(config: CustodyConfig, parts: Collaborators) -> Self {
        let signer = Arc::new(SignerAdapter::new(
            parts.provider,
            Duration::from_secs(config.timeouts.signer_secs),
            Duration::from_millis(config.timeouts.probe_ms),
        ));
        let session = Arc::new(
            Session::new(signer, parts.ledger, config.admin.identity.clone())
                .with_auto_connect_local_only(config.signer.auto_connect_local_only),
        );
        let repository = Arc::new(ProposalRepository::new(parts.relay.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            session.clone(),
            repository.clone(),
            parts.relay,
            NetworkContext::new(config.network.passphrase.clone()),
        ));

        let admin = config
            .admin
            .identity
            .as_deref()
            .map(abbreviate)
            .unwrap_or_else(|| "<none>".to_string());
        tracing::info!(
            network = %config.network.label,
            relay = %config.relay.base_url,
            admin = %admin,
            "Custody core assembled"
        );

        Self {
            config,
            session,
            repository,
            orchestrator,
        }
    }

    /// Assemble over HTTP collaborators built from `config`.
    pub fn from_config(config: CustodyConfig) -> Result<Self, StartupError> {
        let parts = Collaborators::from_config(&config)?;
        Ok(Self::assemble(config, parts))
    }

    /// Silent reconnect, then an initial refresh when an identity was restored.
    pub async fn start(&self) -> Option<String> {
        let identity = self.session.auto_connect().await?;
        if let Err(e) = self.orchestrator.refresh().await {
            tracing::warn!(error = %e, "Initial proposal refresh failed");
        }
        Some(identity)
    }

    /// Ensure a connected identity, prompting through the wallet if needed.
    pub async fn ensure_connected(&self) -> Result<String, SignerError> {
        if let Some((identity, _)) = self.session.actor() {
            return Ok(identity);
        }
        let identity = self.session.connect().await?;
        if let Err(e) = self.orchestrator.refresh().await {
            tracing::warn!(error = %e, "Proposal refresh after connect failed");
        }
        Ok(identity)
    }
}

impl std::fmt::Debug for Custody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custody")
            .field("session", &self.session)
            .field("repository", &self.repository)
            .finish()
    }
}
