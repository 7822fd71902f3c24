//! Typed wrapper over an injected signing provider.
//!
//! # Responsibilities
//! - Probe whether a provider is present
//! - Translate raw provider faults into `SignerError` kinds
//! - Bound every provider call with a timeout
//! - Retry `signTransaction` once with the alternate call shape on a shape mismatch

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::{abbreviate, metrics};
use crate::resilience::with_deadline;
use crate::signer::types::{
    CallShape, MessageSignature, NetworkContext, ProviderFault, SignTransactionCall, SignerError,
    SignerResult, CODE_INVALID_PARAMS, CODE_USER_REJECTED,
};
use crate::signer::SigningProvider;

const REJECTION_MARKERS: &[&str] = &["declined", "rejected", "denied", "cancelled", "canceled"];
const SHAPE_MARKERS: &[&str] = &[
    "invalid params",
    "invalid argument",
    "unexpected argument",
    "expected object",
    "expected string",
    "shape",
];

/// How a raw fault should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classified {
    /// The provider did not accept the argument layout.
    ShapeMismatch(String),
    /// Terminal for this call.
    Final(SignerError),
}

/// Map a raw provider fault onto the typed taxonomy.
pub(crate) fn classify(fault: ProviderFault) -> Classified {
    match fault {
        ProviderFault::Unreachable(msg) => Classified::Final(SignerError::ProviderUnavailable(msg)),
        ProviderFault::Rejected { code, message } => {
            let lower = message.to_lowercase();
            if code == Some(CODE_USER_REJECTED)
                || REJECTION_MARKERS.iter().any(|m| lower.contains(m))
            {
                Classified::Final(SignerError::UserRejected(message))
            } else if code == Some(CODE_INVALID_PARAMS)
                || SHAPE_MARKERS.iter().any(|m| lower.contains(m))
            {
                Classified::ShapeMismatch(message)
            } else {
                Classified::Final(SignerError::ProviderError(message))
            }
        }
    }
}

fn finalize(classified: Classified) -> SignerError {
    match classified {
        Classified::Final(e) => e,
        Classified::ShapeMismatch(msg) => SignerError::ProviderError(msg),
    }
}

/// Signer Adapter: the only path from the orchestrator to the wallet.
pub struct SignerAdapter {
    provider: Option<Arc<dyn SigningProvider>>,
    call_timeout: Duration,
    probe_timeout: Duration,
    preferred_shape: AtomicU8,
}

impl SignerAdapter {
    /// Wrap a provider. `None` models "no wallet installed".
    pub fn new(
        provider: Option<Arc<dyn SigningProvider>>,
        call_timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            call_timeout,
            probe_timeout,
            preferred_shape: AtomicU8::new(CallShape::Positional.as_u8()),
        }
    }

    /// Host of the provider endpoint, if it has one.
    pub fn provider_host(&self) -> Option<String> {
        self.provider.as_ref().and_then(|p| p.endpoint_host())
    }

    /// Call shape tried first on the next `sign_transaction`.
    pub fn preferred_shape(&self) -> CallShape {
        CallShape::from_u8(self.preferred_shape.load(Ordering::Relaxed))
    }

    fn provider(&self) -> SignerResult<&Arc<dyn SigningProvider>> {
        self.provider.as_ref().ok_or_else(|| {
            SignerError::ProviderUnavailable("no signing provider installed".to_string())
        })
    }

    async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T, Classified>
    where
        F: std::future::Future<Output = Result<T, ProviderFault>>,
    {
        let result = with_deadline(self.call_timeout, async { fut.await.map_err(classify) }, |d| {
            Classified::Final(SignerError::ProviderError(format!(
                "{} timed out after {:?}",
                op, d
            )))
        })
        .await;

        metrics::record_signer_call(op, if result.is_ok() { "ok" } else { "error" });
        result
    }

    /// Runtime capability probe. Never fails.
    pub async fn is_available(&self) -> bool {
        let Some(provider) = self.provider.as_ref() else {
            return false;
        };
        match tokio::time::timeout(self.probe_timeout, provider.probe()).await {
            Ok(available) => available,
            Err(_) => {
                tracing::debug!(provider = provider.name(), "Provider probe timed out");
                false
            }
        }
    }

    /// Ask the provider for the active identity, prompting the user if needed.
    pub async fn get_identity(&self) -> SignerResult<String> {
        let provider = self.provider()?;
        let key = self
            .call("get_public_key", provider.request_public_key())
            .await
            .map_err(finalize)?;
        non_empty(key).ok_or(SignerError::NoIdentity)
    }

    /// Read an already-authorized identity without prompting.
    pub async fn authorized_identity(&self) -> SignerResult<Option<String>> {
        let provider = self.provider()?;
        let key = self
            .call("authorized_public_key", provider.authorized_public_key())
            .await
            .map_err(finalize)?;
        Ok(non_empty(key))
    }

    /// Sign an arbitrary text message.
    pub async fn sign_message(&self, message: &str) -> SignerResult<MessageSignature> {
        let provider = self.provider()?;
        let signed = self
            .call("sign_message", provider.sign_message(message))
            .await
            .map_err(finalize)?;

        if signed.signature.trim().is_empty() {
            return Err(SignerError::ProviderError(
                "provider returned an empty signature".to_string(),
            ));
        }
        Ok(signed)
    }

    /// Sign an unsigned transaction payload for `network`.
    pub async fn sign_transaction(
        &self,
        unsigned_payload: &str,
        network: &NetworkContext,
    ) -> SignerResult<String> {
        let provider = self.provider()?;
        self.check_network(provider, network).await?;

        let first = self.preferred_shape();
        let signed = match self.try_sign(provider, first, unsigned_payload, network).await {
            Ok(signed) => signed,
            Err(Classified::ShapeMismatch(msg)) => {
                let second = first.alternate();
                tracing::warn!(
                    provider = provider.name(),
                    rejected_shape = ?first,
                    retry_shape = ?second,
                    error = %msg,
                    "Provider rejected call shape, retrying once"
                );
                let signed = self
                    .try_sign(provider, second, unsigned_payload, network)
                    .await
                    .map_err(|c| match c {
                        Classified::ShapeMismatch(msg2) => SignerError::ProviderError(format!(
                            "provider rejected both call shapes: {}; {}",
                            msg, msg2
                        )),
                        Classified::Final(e) => e,
                    })?;
                self.preferred_shape.store(second.as_u8(), Ordering::Relaxed);
                signed
            }
            Err(Classified::Final(e)) => return Err(e),
        };

        if signed.trim().is_empty() {
            return Err(SignerError::ProviderError(
                "provider returned an empty signed payload".to_string(),
            ));
        }

        tracing::debug!(signed = %abbreviate(&signed), "Transaction signed");
        Ok(signed)
    }

    async fn try_sign(
        &self,
        provider: &Arc<dyn SigningProvider>,
        shape: CallShape,
        unsigned_payload: &str,
        network: &NetworkContext,
    ) -> Result<String, Classified> {
        let call = SignTransactionCall {
            shape,
            xdr: unsigned_payload.to_string(),
            network_passphrase: network.passphrase.clone(),
        };
        self.call("sign_transaction", provider.sign_transaction(call))
            .await
    }

    async fn check_network(
        &self,
        provider: &Arc<dyn SigningProvider>,
        network: &NetworkContext,
    ) -> SignerResult<()> {
        match self
            .call("network_passphrase", provider.network_passphrase())
            .await
        {
            Ok(Some(actual)) if actual.trim() != network.passphrase.trim() => {
                Err(SignerError::NetworkMismatch {
                    expected: network.passphrase.clone(),
                    actual,
                })
            }
            Ok(_) => Ok(()),
            Err(Classified::Final(e @ SignerError::ProviderUnavailable(_))) => Err(e),
            Err(other) => {
                tracing::debug!(error = ?other, "Provider did not report its network");
                Ok(())
            }
        }
    }
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

impl std::fmt::Debug for SignerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerAdapter")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("call_timeout", &self.call_timeout)
            .field("preferred_shape", &self.preferred_shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider that accepts only one call shape.
    struct ShapeProvider {
        accepts: Option<CallShape>,
        network: Option<String>,
        calls: Mutex<Vec<CallShape>>,
    }

    impl ShapeProvider {
        fn new(accepts: Option<CallShape>) -> Self {
            Self {
                accepts,
                network: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SigningProvider for ShapeProvider {
        fn name(&self) -> &str {
            "shape"
        }
        async fn probe(&self) -> bool {
            true
        }
        async fn request_public_key(&self) -> Result<Option<String>, ProviderFault> {
            Ok(Some("  GKEY  ".into()))
        }
        async fn authorized_public_key(&self) -> Result<Option<String>, ProviderFault> {
            Ok(Some(String::new()))
        }
        async fn network_passphrase(&self) -> Result<Option<String>, ProviderFault> {
            Ok(self.network.clone())
        }
        async fn sign_message(&self, _message: &str) -> Result<MessageSignature, ProviderFault> {
            Err(ProviderFault::rejected(CODE_USER_REJECTED, "User declined"))
        }
        async fn sign_transaction(&self, call: SignTransactionCall) -> Result<String, ProviderFault> {
            self.calls.lock().unwrap().push(call.shape);
            if Some(call.shape) == self.accepts {
                Ok(format!("SIGNED:{}", call.xdr))
            } else {
                Err(ProviderFault::rejected(CODE_INVALID_PARAMS, "Invalid params"))
            }
        }
    }

    fn adapter(provider: Arc<dyn SigningProvider>) -> SignerAdapter {
        SignerAdapter::new(Some(provider), Duration::from_secs(1), Duration::from_millis(100))
    }

    fn testnet() -> NetworkContext {
        NetworkContext::new("Test SDF Network ; September 2015")
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            classify(ProviderFault::Unreachable("refused".into())),
            Classified::Final(SignerError::ProviderUnavailable("refused".into()))
        );
        assert_eq!(
            classify(ProviderFault::Rejected {
                code: None,
                message: "User denied access".into()
            }),
            Classified::Final(SignerError::UserRejected("User denied access".into()))
        );
        assert_eq!(
            classify(ProviderFault::rejected(-1, "expected object, got string")),
            Classified::ShapeMismatch("expected object, got string".into())
        );
        assert_eq!(
            classify(ProviderFault::rejected(-32000, "wallet locked")),
            Classified::Final(SignerError::ProviderError("wallet locked".into()))
        );
    }

    #[tokio::test]
    async fn test_no_provider() {
        let adapter = SignerAdapter::new(None, Duration::from_secs(1), Duration::from_secs(1));
        assert!(!adapter.is_available().await);
        let err = adapter.get_identity().await.unwrap_err();
        assert!(matches!(err, SignerError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_identity_trimmed_and_empty_is_none() {
        let adapter = adapter(Arc::new(ShapeProvider::new(None)));
        assert_eq!(adapter.get_identity().await.unwrap(), "GKEY");
        assert_eq!(adapter.authorized_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_falls_back_to_options_shape_once() {
        let provider = Arc::new(ShapeProvider::new(Some(CallShape::Options)));
        let adapter = adapter(provider.clone());

        let signed = adapter.sign_transaction("AAAA", &testnet()).await.unwrap();
        assert_eq!(signed, "SIGNED:AAAA");
        assert_eq!(
            *provider.calls.lock().unwrap(),
            vec![CallShape::Positional, CallShape::Options]
        );

        // The working shape is remembered.
        assert_eq!(adapter.preferred_shape(), CallShape::Options);
        adapter.sign_transaction("BBBB", &testnet()).await.unwrap();
        assert_eq!(provider.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_both_shapes_rejected_surfaces_provider_error() {
        let provider = Arc::new(ShapeProvider::new(None));
        let adapter = adapter(provider.clone());

        let err = adapter.sign_transaction("AAAA", &testnet()).await.unwrap_err();
        assert!(matches!(err, SignerError::ProviderError(_)));
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_network_mismatch_not_retried() {
        let mut provider = ShapeProvider::new(Some(CallShape::Positional));
        provider.network = Some("Public Global Stellar Network ; September 2015".into());
        let provider = Arc::new(provider);
        let adapter = adapter(provider.clone());

        let err = adapter.sign_transaction("AAAA", &testnet()).await.unwrap_err();
        assert!(matches!(err, SignerError::NetworkMismatch { .. }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    /// Provider that never answers a signing request.
    struct StalledProvider;

    #[async_trait]
    impl SigningProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }
        async fn probe(&self) -> bool {
            true
        }
        async fn request_public_key(&self) -> Result<Option<String>, ProviderFault> {
            Ok(Some("GKEY".into()))
        }
        async fn authorized_public_key(&self) -> Result<Option<String>, ProviderFault> {
            Ok(None)
        }
        async fn sign_message(&self, _message: &str) -> Result<MessageSignature, ProviderFault> {
            std::future::pending().await
        }
        async fn sign_transaction(&self, _call: SignTransactionCall) -> Result<String, ProviderFault> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_provider_timeout_is_provider_error() {
        let adapter = SignerAdapter::new(
            Some(Arc::new(StalledProvider)),
            Duration::from_millis(50),
            Duration::from_millis(50),
        );

        let err = adapter.sign_message("hello").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProviderError);
        assert_eq!(
            err,
            SignerError::ProviderError("sign_message timed out after 50ms".into())
        );

        // No shape retry on a timeout.
        let err = adapter.sign_transaction("AAAA", &testnet()).await.unwrap_err();
        assert_eq!(
            err,
            SignerError::ProviderError("sign_transaction timed out after 50ms".into())
        );
        assert_eq!(adapter.preferred_shape(), CallShape::Positional);
    }

    #[tokio::test]
    async fn test_message_rejection_is_typed() {
        let adapter = adapter(Arc::new(ShapeProvider::new(None)));
        let err = adapter.sign_message("hello").await.unwrap_err();
        assert_eq!(err, SignerError::UserRejected("User declined".into()));
    }
}
