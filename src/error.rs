//! Failure classification shared by every subsystem.

use serde::Serialize;

/// Coarse failure kind callers branch on to decide between retry and abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Signing capability absent.
    ProviderUnavailable,
    /// The signer declined.
    UserRejected,
    /// The signer failed unexpectedly (includes timeouts and locked wallets).
    ProviderError,
    /// Relay or ledger unreachable, timed out, or answered non-2xx.
    NetworkError,
    /// Relay reachable but refused on a business rule.
    RelayRejected,
    /// Role gate failed.
    Unauthorized,
    /// No active identity.
    Unauthenticated,
    /// Refused locally because the proposal is already Ready.
    AlreadyFinalized,
    /// Refused locally before any network call (bad input, unknown proposal, busy).
    LocalRefusal,
}

impl ErrorKind {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::RelayRejected => "relay_rejected",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::AlreadyFinalized => "already_finalized",
            ErrorKind::LocalRefusal => "local_refusal",
        }
    }

    /// Whether repeating the same caller action may succeed without changing inputs.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError | ErrorKind::ProviderError | ErrorKind::ProviderUnavailable
        )
    }
}
