//! Challenge-response login.
//!
//! A [`ChallengeFlow`] walks one challenge through
//!
//! ```text
//! Requested -> Received -> Validated -> Signed -> Submitted -> Authenticated
//! ```
//!
//! with `Failed` reachable from every state. Steps cannot be skipped or
//! repeated; calling one out of order fails the flow. A flow is single-use.

use std::fmt;
use std::sync::Arc;

use smartauth_core::{
    validate_challenge, AuthorizationEntry, ChallengeParams, Principal, ValidatedChallenge,
};
use smartauth_signer::{Signer, SignerError};

use crate::context::{bounded, AuthContext};
use crate::discovery::select_signers;
use crate::endpoint::{parse_challenge, signed_entries_body, ChallengeQuery};
use crate::error::{AuthError, Result};
use crate::events::Event;
use crate::token::{token_from_body, AuthToken};

/// Where a challenge flow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    Requested,
    Received,
    Validated,
    Signed,
    Submitted,
    Authenticated,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Requested => "requested",
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        })
    }
}

/// Client-domain verification: a second principal co-signs the challenge.
#[derive(Debug, Clone)]
pub struct ClientDomain {
    /// Domain sent with the challenge request.
    pub domain: String,
    /// The domain's signing account.
    pub principal: Principal,
    pub signers: Vec<Signer>,
}

/// Per-call options for [`SmartAuth::authenticate`](crate::SmartAuth::authenticate).
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub client_domain: Option<ClientDomain>,
    /// Credential id to record in the session and credential store.
    pub credential_id: Option<String>,
}

/// One run of the challenge-response protocol.
pub struct ChallengeFlow {
    ctx: Arc<AuthContext>,
    principal: Principal,
    client_domain: Option<ClientDomain>,
    params: ChallengeParams,
    state: FlowState,
    entries: Vec<AuthorizationEntry>,
    validated: Option<ValidatedChallenge>,
    response: Option<String>,
}

impl ChallengeFlow {
    pub fn new(
        ctx: Arc<AuthContext>,
        principal: Principal,
        client_domain: Option<ClientDomain>,
    ) -> Result<Self> {
        let params = ctx.config.challenge_params(
            principal.clone(),
            client_domain.as_ref().map(|cd| cd.principal.clone()),
        )?;
        Ok(Self {
            ctx,
            principal,
            client_domain,
            params,
            state: FlowState::Requested,
            entries: Vec::new(),
            validated: None,
            response: None,
        })
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// The entries as they currently stand (received, then signed).
    pub fn entries(&self) -> &[AuthorizationEntry] {
        &self.entries
    }

    /// Run every step in order.
    pub async fn run(mut self, signers: &[Signer]) -> Result<AuthToken> {
        self.fetch().await?;
        self.validate()?;
        self.sign(signers).await?;
        self.submit().await?;
        self.finish()
    }

    /// Requested -> Received: fetch the challenge entries.
    pub async fn fetch(&mut self) -> Result<()> {
        self.enter(FlowState::Requested, FlowState::Received)?;
        let result = self.do_fetch().await;
        self.settle(result, FlowState::Received)
    }

    /// Received -> Validated: run the challenge validator.
    pub fn validate(&mut self) -> Result<&ValidatedChallenge> {
        self.enter(FlowState::Received, FlowState::Validated)?;
        let result = validate_challenge(&self.entries, &self.params, self.ctx.hasher())
            .map_err(AuthError::from);
        match result {
            Ok(validated) => {
                self.state = FlowState::Validated;
                tracing::debug!(principal = %self.principal, state = %self.state, "challenge flow");
                Ok(self.validated.insert(validated))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Validated -> Signed: sign the client (and client-domain) entries.
    ///
    /// The server entry is left untouched.
    pub async fn sign(&mut self, signers: &[Signer]) -> Result<()> {
        self.enter(FlowState::Validated, FlowState::Signed)?;
        let result = self.do_sign(signers).await;
        self.settle(result, FlowState::Signed)
    }

    /// Signed -> Submitted: post the signed entries.
    pub async fn submit(&mut self) -> Result<()> {
        self.enter(FlowState::Signed, FlowState::Submitted)?;
        let result = self.do_submit().await;
        self.settle(result, FlowState::Submitted)
    }

    /// Submitted -> Authenticated: parse the returned token.
    pub fn finish(&mut self) -> Result<AuthToken> {
        self.enter(FlowState::Submitted, FlowState::Authenticated)?;
        let result = self
            .response
            .as_deref()
            .ok_or_else(|| AuthError::Endpoint("no response recorded".into()))
            .and_then(token_from_body)
            .and_then(|token| AuthToken::parse(&token, &self.principal.id));
        match result {
            Ok(token) => {
                self.state = FlowState::Authenticated;
                tracing::info!(principal = %self.principal, "authenticated");
                Ok(token)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn do_fetch(&mut self) -> Result<()> {
        let query = ChallengeQuery {
            account: self.principal.id.clone(),
            home_domain: self.ctx.config.home_domain.clone(),
            client_domain: self.client_domain.as_ref().map(|cd| cd.domain.clone()),
        };
        let body = bounded(
            self.ctx.config.submit_timeout(),
            self.ctx.endpoint.get_challenge(&query),
            AuthError::Endpoint,
        )
        .await?;
        let response = parse_challenge(self.ctx.codec.as_ref(), &body)?;
        if let Some(passphrase) = &response.network_passphrase {
            if *passphrase != self.ctx.config.network_passphrase {
                return Err(AuthError::Endpoint(format!(
                    "network passphrase mismatch: server uses `{}`",
                    passphrase
                )));
            }
        }
        self.entries = response.entries;
        Ok(())
    }

    async fn do_sign(&mut self, signers: &[Signer]) -> Result<()> {
        let validated = self
            .validated
            .clone()
            .ok_or_else(|| AuthError::Endpoint("challenge not validated".into()))?;
        let expiration = self.ctx.expiration_ledger().await?;

        let client_signers = select_signers(
            self.ctx.discovery(),
            self.ctx.codec.as_ref(),
            &self.principal.address,
            signers,
        )
        .await?;

        let mut delegated = Vec::new();
        let client = self
            .ctx
            .collector
            .sign_entry(&self.entries[validated.client_index], expiration, &client_signers)
            .await?;
        self.emit_signed(&client.entry, client_signers.len());
        self.entries[validated.client_index] = client.entry;
        delegated.extend(client.delegated_entries);

        if let (Some(index), Some(cd)) = (validated.client_domain_index, &self.client_domain) {
            if cd.signers.is_empty() {
                return Err(SignerError::NoSigners {
                    address: cd.principal.address,
                }
                .into());
            }
            let domain = self
                .ctx
                .collector
                .sign_entry(&self.entries[index], expiration, &cd.signers)
                .await?;
            self.emit_signed(&domain.entry, cd.signers.len());
            self.entries[index] = domain.entry;
            delegated.extend(domain.delegated_entries);
        }

        self.entries.extend(delegated);
        Ok(())
    }

    async fn do_submit(&mut self) -> Result<()> {
        let body = signed_entries_body(self.ctx.codec.as_ref(), &self.entries)?;
        let response = bounded(
            self.ctx.config.submit_timeout(),
            self.ctx.endpoint.post_signed(body),
            AuthError::Endpoint,
        )
        .await?;
        self.response = Some(response);
        Ok(())
    }

    fn emit_signed(&self, entry: &AuthorizationEntry, signers: usize) {
        if let (Some(address), Some(nonce)) = (entry.address(), entry.nonce()) {
            self.ctx.events.emit(Event::EntrySigned {
                address: *address,
                nonce,
                signers,
            });
        }
    }

    /// Check the flow is in `from` before moving to `to`.
    fn enter(&mut self, from: FlowState, to: FlowState) -> Result<()> {
        if self.state == from {
            return Ok(());
        }
        let err = AuthError::InvalidTransition {
            from: self.state,
            attempted: to,
        };
        Err(self.fail(err))
    }

    fn settle(&mut self, result: Result<()>, to: FlowState) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = to;
                tracing::debug!(principal = %self.principal, state = %to, "challenge flow");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, err: AuthError) -> AuthError {
        tracing::warn!(
            principal = %self.principal,
            state = %self.state,
            kind = %err.kind(),
            error = %err,
            "challenge flow failed"
        );
        self.state = FlowState::Failed;
        err
    }
}

impl fmt::Debug for ChallengeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeFlow")
            .field("principal", &self.principal)
            .field("state", &self.state)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
