//! Interactive device-bound signer.
//!
//! The device (a platform authenticator or hardware key) is reached through
//! [`DeviceAuthenticator`]. Prompts may take arbitrarily long; no timeout is
//! imposed here. A user cancellation always fails the pass.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use smartauth_core::{Address, Hash32, Value};
use thiserror::Error;

use crate::error::{Result, SignerError};
use crate::signer::{DigestSigner, SignerKind, EXTERNAL_KEY_TAG};

/// Output of a successful device prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAssertion {
    pub authenticator_data: Bytes,
    pub client_data: Bytes,
    pub signature: Bytes,
}

impl DeviceAssertion {
    /// The signature-map value for this assertion.
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            (
                Value::symbol("authenticator_data"),
                Value::Bytes(self.authenticator_data.clone()),
            ),
            (Value::symbol("client_data"), Value::Bytes(self.client_data.clone())),
            (Value::symbol("signature"), Value::Bytes(self.signature.clone())),
        ])
    }
}

/// Failures reported by a device authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("user cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// The platform side of an interactive signer.
#[async_trait]
pub trait DeviceAuthenticator: Send + Sync {
    /// Prompt the user to sign `digest`.
    async fn authenticate(&self, digest: &Hash32) -> std::result::Result<DeviceAssertion, DeviceError>;
}

/// A device-bound signer verified on-chain by an external verifier contract.
///
/// Occupies the map key `Vec[Symbol("External"), Address(verifier), Bytes(key_material)]`.
#[derive(Clone)]
pub struct DeviceSigner {
    verifier: Address,
    key_material: Bytes,
    authenticator: Arc<dyn DeviceAuthenticator>,
}

impl DeviceSigner {
    pub fn new(
        verifier: Address,
        key_material: impl Into<Bytes>,
        authenticator: Arc<dyn DeviceAuthenticator>,
    ) -> Self {
        Self {
            verifier,
            key_material: key_material.into(),
            authenticator,
        }
    }

    pub fn verifier(&self) -> Address {
        self.verifier
    }
}

impl std::fmt::Debug for DeviceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSigner")
            .field("verifier", &self.verifier)
            .field("key_material_len", &self.key_material.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DigestSigner for DeviceSigner {
    fn key(&self) -> Value {
        Value::Vec(vec![
            Value::symbol(EXTERNAL_KEY_TAG),
            Value::Address(self.verifier),
            Value::Bytes(self.key_material.clone()),
        ])
    }

    fn kind(&self) -> SignerKind {
        SignerKind::Device
    }

    async fn sign_digest(&self, digest: &Hash32) -> Result<Value> {
        tracing::debug!(verifier = %self.verifier, "prompting device signer");
        match self.authenticator.authenticate(digest).await {
            Ok(assertion) => Ok(assertion.to_value()),
            Err(DeviceError::Cancelled) => {
                tracing::info!(verifier = %self.verifier, "device prompt cancelled");
                Err(SignerError::Cancelled {
                    signer: format!("device:{}", self.verifier),
                })
            }
            Err(DeviceError::Failed(reason)) => Err(SignerError::Device {
                signer: format!("device:{}", self.verifier),
                reason,
            }),
        }
    }
}
