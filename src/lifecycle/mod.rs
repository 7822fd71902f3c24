//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → HTTP collaborators → SignerAdapter → Session → Repository → Orchestrator
//!     → silent reconnect → initial refresh
//!
//! Signals (signals.rs):
//!     SIGINT → stop waiting commands
//! ```

pub mod signals;
pub mod startup;

pub use startup::{Collaborators, Custody, StartupError};
