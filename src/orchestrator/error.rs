//! Flow error definitions.

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::relay::RelayError;
use crate::signer::SignerError;

/// Errors surfaced by orchestrator flows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// No connected identity.
    #[error("no connected wallet identity")]
    Unauthenticated,

    /// The caller's role does not permit the action.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The proposal is already Ready; nothing was sent.
    #[error("proposal {0} already has enough signatures")]
    AlreadyFinalized(String),

    /// The proposal is not in the caller's current view.
    #[error("unknown proposal: {0}")]
    UnknownProposal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another flow holds the same key.
    #[error("a {0} flow is already in progress")]
    InFlight(String),

    /// The identity changed while the flow was running.
    #[error("session changed while the operation was running")]
    SessionChanged,

    #[error("proposal {proposal_id} not finalized after {}s", .waited.as_secs())]
    FinalizationTimeout { proposal_id: String, waited: Duration },

    /// Signing succeeded but the relay did not take the result. Nothing is resubmitted.
    #[error("signed but not submitted: {source}")]
    SignedNotSubmitted {
        #[source]
        source: RelayError,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Signer(e) => e.kind(),
            FlowError::Relay(e) => e.kind(),
            FlowError::SignedNotSubmitted { source } => source.kind(),
            FlowError::Unauthenticated => ErrorKind::Unauthenticated,
            FlowError::Unauthorized(_) => ErrorKind::Unauthorized,
            FlowError::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            FlowError::FinalizationTimeout { .. } => ErrorKind::NetworkError,
            FlowError::UnknownProposal(_)
            | FlowError::InvalidRequest(_)
            | FlowError::InFlight(_)
            | FlowError::SessionChanged => ErrorKind::LocalRefusal,
        }
    }
}

/// Result type for orchestrator flows.
pub type FlowResult<T> = Result<T, FlowError>;
