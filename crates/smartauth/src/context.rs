//! Shared collaborators for authentication flows.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use smartauth_core::{Codec, Crypto, PayloadHasher};
use smartauth_signer::SignatureCollector;

use crate::config::AuthConfig;
use crate::discovery::SignerDiscovery;
use crate::endpoint::ChallengeEndpoint;
use crate::error::{AuthError, Result, TransportError};
use crate::events::EventBus;
use crate::ledger::LedgerClient;
use crate::session::Session;

/// Everything a flow needs, shared by handle.
pub struct AuthContext {
    pub config: AuthConfig,
    pub codec: Arc<dyn Codec>,
    pub collector: SignatureCollector,
    pub ledger: Arc<dyn LedgerClient>,
    pub endpoint: Arc<dyn ChallengeEndpoint>,
    pub discovery: Option<Arc<dyn SignerDiscovery>>,
    pub session: Arc<Session>,
    pub events: Arc<EventBus>,
}

impl AuthContext {
    /// Build a context. The configuration is validated first.
    pub fn new(
        config: AuthConfig,
        codec: Arc<dyn Codec>,
        crypto: Arc<dyn Crypto>,
        ledger: Arc<dyn LedgerClient>,
        endpoint: Arc<dyn ChallengeEndpoint>,
    ) -> Result<Self> {
        config.validate()?;
        let hasher = PayloadHasher::new(Arc::clone(&codec), crypto, &config.network_passphrase);
        let events = Arc::new(EventBus::new());
        Ok(Self {
            config,
            codec,
            collector: SignatureCollector::new(hasher),
            ledger,
            endpoint,
            discovery: None,
            session: Arc::new(Session::new(Arc::clone(&events))),
            events,
        })
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn SignerDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn hasher(&self) -> &PayloadHasher {
        self.collector.hasher()
    }

    pub fn discovery(&self) -> Option<&dyn SignerDiscovery> {
        self.discovery.as_deref()
    }

    /// The expiration ledger for a signing pass: latest ledger plus margin.
    pub async fn expiration_ledger(&self) -> Result<u32> {
        let latest = bounded(
            self.config.simulate_timeout(),
            self.ledger.latest_ledger_sequence(),
            AuthError::Simulation,
        )
        .await?;
        Ok(latest.saturating_add(self.config.signature_expiration_margin))
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("home_domain", &self.config.home_domain)
            .field("discovery", &self.discovery.is_some())
            .finish_non_exhaustive()
    }
}

/// Run a collaborator call under `timeout`. Never retried.
///
/// Elapsed timeouts and network errors are network failures; refusals are
/// classified with `rejected`.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    call: F,
    rejected: fn(String) -> AuthError,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|e| AuthError::from_transport(e, rejected)),
        Err(_) => Err(AuthError::Network(format!("timed out after {:?}", timeout))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let err = bounded(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, TransportError>(1)
            },
            AuthError::Submission,
        )
        .await
        .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bounded_classifies_rejection() {
        let err = bounded(
            Duration::from_secs(1),
            async { Err::<u32, _>(TransportError::Rejected("bad fee".into())) },
            AuthError::Submission,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Submission(ref m) if m == "bad fee"));
    }
}
