//! Signer boundary types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Network identity a transaction is signed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    pub passphrase: String,
}

impl NetworkContext {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }
}

/// Argument layout a provider accepts for `signTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// `signTransaction(xdr, networkPassphrase)`
    Positional,
    /// `signTransaction({ xdr, networkPassphrase })`
    Options,
}

impl CallShape {
    pub fn alternate(self) -> Self {
        match self {
            CallShape::Positional => CallShape::Options,
            CallShape::Options => CallShape::Positional,
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            CallShape::Positional => 0,
            CallShape::Options => 1,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => CallShape::Options,
            _ => CallShape::Positional,
        }
    }
}

/// One `signTransaction` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignTransactionCall {
    pub shape: CallShape,
    pub xdr: String,
    pub network_passphrase: String,
}

/// Result of `signMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignature {
    pub signature: String,
    /// Address the provider reports having signed with, when it does.
    #[serde(default, alias = "signerAddress", skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
}

/// Raw failure reported by a provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFault {
    /// The provider could not be reached at all.
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with an error.
    #[error("provider error{}: {message}", fmt_code(.code))]
    Rejected { code: Option<i64>, message: String },
}

fn fmt_code(code: &Option<i64>) -> String {
    code.map(|c| format!(" {}", c)).unwrap_or_default()
}

impl ProviderFault {
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        ProviderFault::Rejected {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// EIP-1193 style "user rejected request" code.
pub const CODE_USER_REJECTED: i64 = 4001;
/// JSON-RPC "invalid params" code; signals a call-shape mismatch.
pub const CODE_INVALID_PARAMS: i64 = -32602;

/// Typed signer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// No provider installed or it cannot be reached.
    #[error("signing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The user declined the request.
    #[error("request rejected by user: {0}")]
    UserRejected(String),

    /// The provider failed unexpectedly.
    #[error("signing provider error: {0}")]
    ProviderError(String),

    /// The provider returned no identity (locked or not authorized).
    #[error("signing provider returned no public key")]
    NoIdentity,

    /// The provider is on a different network than the one configured.
    #[error("network mismatch: configured '{expected}', provider reports '{actual}'")]
    NetworkMismatch { expected: String, actual: String },
}

impl SignerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignerError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            SignerError::UserRejected(_) => ErrorKind::UserRejected,
            SignerError::ProviderError(_)
            | SignerError::NoIdentity
            | SignerError::NetworkMismatch { .. } => ErrorKind::ProviderError,
        }
    }
}

/// Result type for signer operations.
pub type SignerResult<T> = Result<T, SignerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_shape_alternates() {
        assert_eq!(CallShape::Positional.alternate(), CallShape::Options);
        assert_eq!(CallShape::Options.alternate(), CallShape::Positional);
        assert_eq!(CallShape::from_u8(CallShape::Options.as_u8()), CallShape::Options);
    }

    #[test]
    fn test_fault_display() {
        let fault = ProviderFault::rejected(4001, "User declined");
        assert_eq!(fault.to_string(), "provider error 4001: User declined");

        let fault = ProviderFault::Rejected {
            code: None,
            message: "locked".into(),
        };
        assert_eq!(fault.to_string(), "provider error: locked");
    }

    #[test]
    fn test_message_signature_accepts_alias() {
        let sig: MessageSignature =
            serde_json::from_str(r#"{"signature":"c2ln","signerAddress":"GABC"}"#).unwrap();
        assert_eq!(sig.signer.as_deref(), Some("GABC"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(SignerError::NoIdentity.kind(), ErrorKind::ProviderError);
        assert_eq!(
            SignerError::UserRejected("no".into()).kind(),
            ErrorKind::UserRejected
        );
    }
}
