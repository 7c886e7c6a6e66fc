//! Delegated signer.
//!
//! A delegate never signs the primary digest. It authorizes a separate
//! entry whose root invocation is the smart account's `__check_auth` call
//! over that digest. The primary entry only records a placeholder for the
//! delegate; the on-chain check finds the real authorization in the
//! delegate's own entry.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use smartauth_core::{
    Address, AuthorizationEntry, AuthorizedInvocation, Codec, CoreError, EntryBuilder, Hash32,
    Value,
};
use thiserror::Error;

use crate::error::{Result, SignerError};
use crate::signer::{EntrySigner, DELEGATED_KEY_TAG};

/// Function the ledger calls on a smart account to check its authorization.
pub const CHECK_AUTH_FN: &str = "__check_auth";

/// Failures reported by a delegate wallet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("wallet unreachable: {0}")]
    Unreachable(String),
}

/// The external wallet holding the delegate's keys.
#[async_trait]
pub trait DelegateWallet: Send + Sync {
    /// Whether the wallet can authorize for `address`.
    async fn can_sign_for(&self, address: &Address) -> std::result::Result<bool, DelegateError>;

    /// Sign an encoded entry and return the encoded, signed entry.
    async fn sign_entry(&self, encoded_entry: Bytes) -> std::result::Result<Bytes, DelegateError>;
}

/// An external principal authorizing through its own entry.
///
/// Occupies the map key `Vec[Symbol("Delegated"), Address(delegate)]` with
/// an empty `Bytes` placeholder value.
#[derive(Clone)]
pub struct DelegatedSigner {
    delegate: Address,
    wallet: Arc<dyn DelegateWallet>,
    codec: Arc<dyn Codec>,
}

impl DelegatedSigner {
    pub fn new(delegate: Address, wallet: Arc<dyn DelegateWallet>, codec: Arc<dyn Codec>) -> Self {
        Self {
            delegate,
            wallet,
            codec,
        }
    }

    pub fn delegate(&self) -> Address {
        self.delegate
    }

    /// The unsigned entry the delegate is asked to authorize.
    pub fn request_entry(
        &self,
        primary: &AuthorizationEntry,
        digest: &Hash32,
        nonce: i64,
    ) -> Result<AuthorizationEntry> {
        let account = *primary
            .address()
            .ok_or(CoreError::NotAddressBased)?;
        let expiration = primary.signature_expiration_ledger().unwrap_or_default();
        Ok(EntryBuilder::new(self.delegate, account, CHECK_AUTH_FN)
            .nonce(nonce)
            .expiration(expiration)
            .arg(Value::bytes(digest.as_bytes()))
            .build())
    }

    fn check_returned(
        &self,
        requested: &AuthorizationEntry,
        returned: &AuthorizationEntry,
    ) -> Result<()> {
        let invalid = |reason| SignerError::InvalidDelegateEntry {
            delegate: self.delegate,
            reason,
        };
        if returned.address() != Some(&self.delegate) {
            return Err(invalid("credentials address is not the delegate"));
        }
        if returned.root_invocation != requested.root_invocation {
            return Err(invalid("root invocation was altered"));
        }
        if returned.nonce() != requested.nonce() {
            return Err(invalid("nonce was altered"));
        }
        if returned.signature_expiration_ledger() != requested.signature_expiration_ledger() {
            return Err(invalid("expiration ledger was altered"));
        }
        if returned.signature().map_or(true, Value::is_void) {
            return Err(invalid("entry is unsigned"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DelegatedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedSigner")
            .field("delegate", &self.delegate)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EntrySigner for DelegatedSigner {
    fn key(&self) -> Value {
        Value::Vec(vec![
            Value::symbol(DELEGATED_KEY_TAG),
            Value::Address(self.delegate),
        ])
    }

    async fn sign_entry(
        &self,
        entry: &AuthorizationEntry,
        digest: &Hash32,
    ) -> Result<AuthorizationEntry> {
        let wallet_error = |e: DelegateError| SignerError::Delegate {
            delegate: self.delegate,
            reason: e.to_string(),
        };

        if !self
            .wallet
            .can_sign_for(&self.delegate)
            .await
            .map_err(wallet_error)?
        {
            return Err(SignerError::Unavailable {
                principal: self.delegate.to_string(),
                reason: "delegate wallet cannot sign for this address".into(),
            });
        }

        let requested = self.request_entry(entry, digest, rand::random())?;
        let encoded = self.codec.encode_entry(&requested)?;

        tracing::debug!(delegate = %self.delegate, "requesting delegated entry");
        let signed = self
            .wallet
            .sign_entry(Bytes::from(encoded))
            .await
            .map_err(wallet_error)?;

        let returned = self.codec.decode_entry(&signed)?;
        self.check_returned(&requested, &returned)?;
        Ok(returned)
    }
}

/// Whether `invocation` is a delegate check for `account`.
pub fn is_check_auth_for(invocation: &AuthorizedInvocation, account: &Address) -> bool {
    invocation
        .as_contract_call()
        .is_some_and(|c| c.contract_address == *account && c.function_name == CHECK_AUTH_FN)
}
