//! Proposal signing orchestration.
//!
//! # Data Flow
//! ```text
//! create / deposit / withdraw:
//!     Session (identity, role) → gate
//!     → RelayClient::build_unsigned_transaction
//!     → SignerAdapter::sign_transaction (network context)
//!     → RelayClient::submit_signed_transaction → tx hash
//!     → ProposalRepository::refresh
//!
//! approve:
//!     cached status gate → approval_message(id)
//!     → SignerAdapter::sign_message
//!     → RelayClient::submit_approval_signature
//!     → ProposalRepository::refresh
//! ```

pub mod engine;
pub mod error;
pub mod guard;
pub mod message;

pub use engine::Orchestrator;
pub use error::{FlowError, FlowResult};
pub use message::approval_message;
