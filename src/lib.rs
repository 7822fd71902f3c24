//! Custody proposal signing orchestrator.
//!
//! Client-side core of a multi-signature asset custody system: tracks the wallet session,
//! keeps a role-filtered view of custody proposals, and drives the build → sign → submit
//! lifecycle against a backend relay and an external signing provider.

pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod proposals;
pub mod relay;
pub mod resilience;
pub mod session;
pub mod signer;

pub use config::CustodyConfig;
pub use error::ErrorKind;
pub use lifecycle::Custody;
pub use orchestrator::{FlowError, Orchestrator};
