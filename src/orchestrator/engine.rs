//! Proposal signing flows.
//!
//! # Responsibilities
//! - Gate each flow on identity, role and cached proposal state before any network call
//! - Run build → sign → submit for contract transactions
//! - Run sign-message → submit for co-signer approvals
//! - Refresh the repository once after every successful state change
//!
//! # Design Decisions
//! - Steps within a flow are strictly sequential and any failure aborts the flow
//! - No retries and no rollback; a retry starts again from the build step
//! - Proposal status is never changed locally; only a refresh updates it

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::observability::{abbreviate, metrics};
use crate::orchestrator::error::{FlowError, FlowResult};
use crate::orchestrator::guard::InFlight;
use crate::orchestrator::message::approval_message;
use crate::proposals::{Proposal, ProposalRepository, Readiness};
use crate::relay::{ContractCall, RelayClient};
use crate::session::{Role, Session};
use crate::signer::NetworkContext;

const FLOW_CREATE: &str = "create_proposal";
const FLOW_APPROVE: &str = "approve_proposal";
const FLOW_DEPOSIT: &str = "deposit";
const FLOW_WITHDRAW: &str = "execute_withdrawal";

/// Identity and role captured at flow start.
#[derive(Debug, Clone)]
struct Actor {
    identity: String,
    role: Role,
    epoch: u64,
}

/// Proposal Signing Orchestrator.
pub struct Orchestrator {
    session: Arc<Session>,
    repository: Arc<ProposalRepository>,
    relay: Arc<dyn RelayClient>,
    network: NetworkContext,
    in_flight: InFlight,
}

impl Orchestrator {
    pub fn new(
        session: Arc<Session>,
        repository: Arc<ProposalRepository>,
        relay: Arc<dyn RelayClient>,
        network: NetworkContext,
    ) -> Self {
        Self {
            session,
            repository,
            relay,
            network,
            in_flight: InFlight::new(),
        }
    }

    fn actor(&self) -> FlowResult<Actor> {
        let snapshot = self.session.snapshot();
        let (identity, role) = snapshot.actor().ok_or(FlowError::Unauthenticated)?;
        Ok(Actor {
            identity,
            role,
            epoch: snapshot.epoch,
        })
    }

    /// Rebuild the repository view for the connected identity.
    pub async fn refresh(&self) -> FlowResult<Arc<Vec<Proposal>>> {
        let actor = self.actor()?;
        let proposals = self
            .repository
            .refresh(&actor.identity, actor.role)
            .await?;

        if self.session.epoch() != actor.epoch {
            tracing::debug!("Identity changed during refresh, dropping result");
            self.repository.clear();
            return Err(FlowError::SessionChanged);
        }
        Ok(proposals)
    }

    /// Disconnect the wallet and drop the cached view.
    pub fn disconnect(&self) {
        self.session.disconnect();
        self.repository.clear();
    }

    /// Create a custody proposal. Admin only.
    ///
    /// Returns the transaction hash reported by the relay.
    pub async fn create_proposal(
        &self,
        required_signatures: u32,
        insurance_enabled: bool,
    ) -> FlowResult<String> {
        let result = self
            .run_create(required_signatures, insurance_enabled)
            .await;
        finish(FLOW_CREATE, None, result)
    }

    async fn run_create(&self, required_signatures: u32, insurance_enabled: bool) -> FlowResult<String> {
        let actor = self.actor()?;
        if !actor.role.is_admin() {
            return Err(FlowError::Unauthorized(
                "only the administrator can create custody proposals".to_string(),
            ));
        }
        if required_signatures == 0 {
            return Err(FlowError::InvalidRequest(
                "required signatures must be at least 1".to_string(),
            ));
        }
        let _ticket = self.in_flight.acquire("create".to_string(), FLOW_CREATE)?;

        tracing::info!(
            flow = FLOW_CREATE,
            required_signatures,
            insurance_enabled,
            "Flow started"
        );

        let call = ContractCall::CreateCustodyAccount {
            owner: actor.identity.clone(),
            required_signatures,
            insurance: insurance_enabled,
        };
        let tx_hash = self.build_sign_submit(&call).await?;
        self.refresh_after(FLOW_CREATE, &actor).await;
        Ok(tx_hash)
    }

    /// Add the caller's approval signature to a pending proposal.
    pub async fn approve_proposal(&self, proposal_id: &str) -> FlowResult<()> {
        let result = self.run_approve(proposal_id).await;
        finish(FLOW_APPROVE, Some(proposal_id), result)
    }

    async fn run_approve(&self, proposal_id: &str) -> FlowResult<()> {
        let actor = self.actor()?;
        let proposal = self
            .repository
            .get(proposal_id)
            .ok_or_else(|| FlowError::UnknownProposal(proposal_id.to_string()))?;
        if proposal.is_ready() {
            return Err(FlowError::AlreadyFinalized(proposal_id.to_string()));
        }
        let _ticket = self
            .in_flight
            .acquire(proposal_key(proposal_id), FLOW_APPROVE)?;

        tracing::info!(flow = FLOW_APPROVE, proposal_id, "Flow started");

        let message = approval_message(proposal_id);
        let signed = self.session.signer().sign_message(&message).await?;
        if let Some(reported) = signed.signer.as_deref() {
            if reported.trim() != actor.identity {
                tracing::warn!(
                    proposal_id,
                    reported = %abbreviate(reported),
                    identity = %abbreviate(&actor.identity),
                    "Provider signed with a different address than the session identity"
                );
            }
        }

        self.relay
            .submit_approval_signature(proposal_id, &actor.identity, &signed.signature)
            .await
            .map_err(|source| FlowError::SignedNotSubmitted { source })?;

        self.refresh_after(FLOW_APPROVE, &actor).await;
        Ok(())
    }

    /// Deposit `amount` into the caller's custody account.
    pub async fn deposit(&self, amount: u64) -> FlowResult<String> {
        let result = self.run_deposit(amount).await;
        finish(FLOW_DEPOSIT, None, result)
    }

    async fn run_deposit(&self, amount: u64) -> FlowResult<String> {
        let actor = self.actor()?;
        if amount == 0 {
            return Err(FlowError::InvalidRequest(
                "deposit amount must be positive".to_string(),
            ));
        }
        let _ticket = self
            .in_flight
            .acquire(format!("deposit:{}", actor.identity), FLOW_DEPOSIT)?;

        tracing::info!(flow = FLOW_DEPOSIT, amount, "Flow started");

        let call = ContractCall::DepositAssets {
            owner: actor.identity.clone(),
            amount,
        };
        let tx_hash = self.build_sign_submit(&call).await?;
        self.refresh_after(FLOW_DEPOSIT, &actor).await;
        Ok(tx_hash)
    }

    /// Execute the withdrawal of a Ready proposal. Admin or the proposal owner.
    ///
    /// Without an amount the relay derives the withdrawal from the proposal; with one the
    /// contract call is built directly with the collected signature count.
    pub async fn execute_withdrawal(
        &self,
        proposal_id: &str,
        amount: Option<u64>,
    ) -> FlowResult<String> {
        let result = self.run_withdrawal(proposal_id, amount).await;
        finish(FLOW_WITHDRAW, Some(proposal_id), result)
    }

    async fn run_withdrawal(&self, proposal_id: &str, amount: Option<u64>) -> FlowResult<String> {
        let actor = self.actor()?;
        let proposal = self
            .repository
            .get(proposal_id)
            .ok_or_else(|| FlowError::UnknownProposal(proposal_id.to_string()))?;
        if !actor.role.is_admin() && proposal.owner != actor.identity {
            return Err(FlowError::Unauthorized(
                "only the administrator or the proposal owner can withdraw".to_string(),
            ));
        }
        if !proposal.is_ready() {
            return Err(FlowError::InvalidRequest(format!(
                "proposal {} is not ready ({} of {} signatures)",
                proposal_id,
                proposal.signatures.len(),
                proposal.required_signatures
            )));
        }
        if amount == Some(0) {
            return Err(FlowError::InvalidRequest(
                "withdrawal amount must be positive".to_string(),
            ));
        }
        let _ticket = self
            .in_flight
            .acquire(proposal_key(proposal_id), FLOW_WITHDRAW)?;

        tracing::info!(flow = FLOW_WITHDRAW, proposal_id, amount = ?amount, "Flow started");

        let unsigned = match amount {
            None => self.relay.build_withdrawal(proposal_id).await?,
            Some(amount) => {
                let call = ContractCall::WithdrawAssets {
                    owner: proposal.owner.clone(),
                    amount,
                    signatures_count: u32::try_from(proposal.signatures.len()).unwrap_or(u32::MAX),
                };
                self.relay
                    .build_unsigned_transaction(call.function(), call.params())
                    .await?
            }
        };
        let tx_hash = self.sign_and_submit(&unsigned).await?;
        self.refresh_after(FLOW_WITHDRAW, &actor).await;
        Ok(tx_hash)
    }

    /// Cached signature progress of a proposal in the caller's view.
    pub fn readiness(&self, proposal_id: &str) -> FlowResult<Readiness> {
        self.repository
            .get(proposal_id)
            .map(|p| p.readiness())
            .ok_or_else(|| FlowError::UnknownProposal(proposal_id.to_string()))
    }

    /// Poll the relay until `proposal_id` is reported Ready or `deadline` passes.
    pub async fn await_finalization(
        &self,
        proposal_id: &str,
        poll: Duration,
        deadline: Duration,
    ) -> FlowResult<Proposal> {
        if let Some(p) = self.repository.get(proposal_id).filter(|p| p.is_ready()) {
            return Ok(p);
        }

        let wait = async {
            let mut ticker = interval(poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.refresh().await {
                    Ok(_) => match self.repository.get(proposal_id) {
                        Some(p) if p.is_ready() => return Ok(p),
                        Some(p) => {
                            let r = p.readiness();
                            tracing::debug!(
                                proposal_id,
                                collected = r.collected,
                                required = r.required,
                                "Waiting for signatures"
                            );
                        }
                        None => return Err(FlowError::UnknownProposal(proposal_id.to_string())),
                    },
                    Err(e) if e.kind().is_transient() => {
                        tracing::warn!(proposal_id, error = %e, "Refresh failed while waiting, will retry");
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        match timeout(deadline, wait).await {
            Ok(result) => result,
            Err(_) => Err(FlowError::FinalizationTimeout {
                proposal_id: proposal_id.to_string(),
                waited: deadline,
            }),
        }
    }

    async fn build_sign_submit(&self, call: &ContractCall) -> FlowResult<String> {
        let unsigned = self
            .relay
            .build_unsigned_transaction(call.function(), call.params())
            .await?;
        tracing::debug!(function = call.function(), unsigned = %abbreviate(&unsigned), "Transaction built");
        self.sign_and_submit(&unsigned).await
    }

    async fn sign_and_submit(&self, unsigned: &str) -> FlowResult<String> {
        let signed = self
            .session
            .signer()
            .sign_transaction(unsigned, &self.network)
            .await?;

        self.relay
            .submit_signed_transaction(&signed)
            .await
            .map_err(|source| FlowError::SignedNotSubmitted { source })
    }

    /// Post-commit refresh. The flow already succeeded, so failure is only logged.
    async fn refresh_after(&self, flow: &'static str, actor: &Actor) {
        if self.session.epoch() != actor.epoch {
            tracing::debug!(flow, "Identity changed during flow, skipping refresh");
            return;
        }
        if let Err(e) = self.repository.refresh(&actor.identity, actor.role).await {
            tracing::warn!(flow, error = %e, "Refresh after commit failed");
        }
    }
}

fn proposal_key(proposal_id: &str) -> String {
    format!("proposal:{}", proposal_id)
}

fn finish<T>(flow: &'static str, proposal_id: Option<&str>, result: FlowResult<T>) -> FlowResult<T> {
    match &result {
        Ok(_) => {
            metrics::record_flow(flow, "ok");
            tracing::info!(flow, proposal_id, "Flow succeeded");
        }
        Err(e) => {
            let kind = e.kind();
            metrics::record_flow(flow, kind.as_str());
            tracing::warn!(flow, proposal_id, kind = kind.as_str(), error = %e, "Flow failed");
        }
    }
    result
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session", &self.session)
            .field("repository", &self.repository)
            .field("network", &self.network)
            .finish()
    }
}
