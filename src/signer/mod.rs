//! Signing provider boundary.
//!
//! # Data Flow
//! ```text
//! Orchestrator / Session
//!     → adapter.rs (probe, timeouts, fault classification, call-shape fallback)
//!     → SigningProvider (bridge.rs over HTTP, or any injected implementation)
//!     → external wallet
//! ```
//!
//! # Security Constraints
//! - Private keys never enter this process; the wallet signs
//! - Signatures and signed payloads are never logged in full

pub mod adapter;
pub mod bridge;
pub mod types;

use async_trait::async_trait;

pub use adapter::SignerAdapter;
pub use bridge::BridgeProvider;
pub use types::{
    CallShape, MessageSignature, NetworkContext, ProviderFault, SignTransactionCall, SignerError,
    SignerResult,
};

/// Raw capability set of an external wallet.
///
/// Implementations report failures as `ProviderFault`; classification into typed
/// errors is the adapter's job.
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Display name for logs.
    fn name(&self) -> &str;

    /// Host the provider is reached through, if any. In-process providers return `None`.
    fn endpoint_host(&self) -> Option<String> {
        None
    }

    /// Cheap presence check.
    async fn probe(&self) -> bool;

    /// Return the active public key, prompting the user for access if needed.
    async fn request_public_key(&self) -> Result<Option<String>, ProviderFault>;

    /// Return the public key only if access was granted earlier; never prompts.
    async fn authorized_public_key(&self) -> Result<Option<String>, ProviderFault>;

    /// Network passphrase the wallet is currently set to, when it exposes one.
    async fn network_passphrase(&self) -> Result<Option<String>, ProviderFault> {
        Ok(None)
    }

    /// Sign a text message.
    async fn sign_message(&self, message: &str) -> Result<MessageSignature, ProviderFault>;

    /// Sign a transaction payload using the call layout in `call.shape`.
    async fn sign_transaction(&self, call: SignTransactionCall) -> Result<String, ProviderFault>;
}
