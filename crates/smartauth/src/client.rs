//! The main entry point.

use std::sync::Arc;

use smartauth_core::{
    validate_challenge, Address, AuthorizationEntry, ChallengeError, ChallengeParams, Codec,
    Crypto, Principal, ValidatedChallenge,
};
use smartauth_signer::Signer;

use crate::challenge::{AuthOptions, ChallengeFlow};
use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::endpoint::ChallengeEndpoint;
use crate::error::{AuthError, Result};
use crate::events::EventBus;
use crate::ledger::{LedgerClient, Operation, SubmitResult};
use crate::pipeline;
use crate::session::{Session, SessionSnapshot};
use crate::store::CredentialStore;
use crate::token::AuthToken;

/// Authenticates principals and runs multi-signer operations.
///
/// Cheap to clone; clones share one session and event bus.
#[derive(Clone)]
pub struct SmartAuth {
    ctx: Arc<AuthContext>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl SmartAuth {
    /// Create a client. Fails if `config` does not validate.
    pub fn new(
        config: AuthConfig,
        codec: Arc<dyn Codec>,
        crypto: Arc<dyn Crypto>,
        ledger: Arc<dyn LedgerClient>,
        endpoint: Arc<dyn ChallengeEndpoint>,
    ) -> Result<Self> {
        Ok(Self::from_context(AuthContext::new(
            config, codec, crypto, ledger, endpoint,
        )?))
    }

    /// Wrap a prepared context, e.g. one with signer discovery installed.
    pub fn from_context(ctx: AuthContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.ctx.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.ctx.events
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.ctx.session
    }

    /// Validate challenge entries against `params`.
    ///
    /// Pure: no network access and no state change.
    pub fn validate_challenge(
        &self,
        entries: &[AuthorizationEntry],
        params: &ChallengeParams,
    ) -> std::result::Result<ValidatedChallenge, ChallengeError> {
        validate_challenge(entries, params, self.ctx.hasher())
    }

    /// Start a challenge flow without running it.
    pub fn challenge(
        &self,
        principal: Principal,
        options: &AuthOptions,
    ) -> Result<ChallengeFlow> {
        ChallengeFlow::new(
            Arc::clone(&self.ctx),
            principal,
            options.client_domain.clone(),
        )
    }

    /// Authenticate `principal` and connect the session.
    ///
    /// On success the session expires with the token, and the credential
    /// id (if given) is recorded in the credential store.
    pub async fn authenticate(
        &self,
        principal: Principal,
        signers: &[Signer],
        options: AuthOptions,
    ) -> Result<AuthToken> {
        let contract = principal.address;
        let token = self.challenge(principal, &options)?.run(signers).await?;

        if let (Some(store), Some(credential_id)) = (&self.store, &options.credential_id) {
            store
                .put(credential_id, contract)
                .await
                .map_err(|e| AuthError::Store(e.0))?;
        }
        self.ctx
            .session
            .connect(options.credential_id, contract, Some(token.expires_at()))
            .await;
        Ok(token)
    }

    /// Reconnect to the contract stored for `credential_id`.
    pub async fn connect(&self, credential_id: &str) -> Result<Address> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AuthError::Config("no credential store configured".into()))?;
        let contract = store
            .get(credential_id)
            .await
            .map_err(|e| AuthError::Store(e.0))?
            .ok_or(AuthError::NotConnected)?;
        self.ctx
            .session
            .connect(Some(credential_id.to_string()), contract, None)
            .await;
        Ok(contract)
    }

    /// Disconnect the session. With `forget`, also drop the stored mapping.
    pub async fn disconnect(&self, forget: bool) -> Result<bool> {
        if forget {
            if let (Some(store), Ok(snapshot)) = (&self.store, self.ctx.session.snapshot().await) {
                if let Some(credential_id) = &snapshot.credential_id {
                    store
                        .remove(credential_id)
                        .await
                        .map_err(|e| AuthError::Store(e.0))?;
                }
            }
        }
        Ok(self.ctx.session.disconnect().await)
    }

    /// The connected session, if any.
    pub async fn current_session(&self) -> Result<SessionSnapshot> {
        self.ctx.session.snapshot().await
    }

    /// Sign and submit `operation` for the connected account.
    pub async fn execute_multi_signer_operation(
        &self,
        operation: Operation,
        signers: &[Signer],
    ) -> Result<SubmitResult> {
        pipeline::execute(&self.ctx, operation, signers).await
    }
}

impl std::fmt::Debug for SmartAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartAuth")
            .field("ctx", &self.ctx)
            .field("store", &self.store.is_some())
            .finish()
    }
}
