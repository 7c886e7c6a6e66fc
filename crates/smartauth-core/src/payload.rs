//! Signature payload hashing.
//!
//! Every signer of an entry signs the same 32-byte digest:
//!
//! ```text
//! hash(encode([ENVELOPE_TYPE, network_id, nonce, expiration, root_invocation]))
//! ```
//!
//! where `network_id = hash(network_passphrase)`. Signers never coordinate
//! encoding order; determinism comes entirely from the codec.

use std::sync::Arc;

use crate::canonical::Codec;
use crate::crypto::{Crypto, Hash32};
use crate::entry::{AuthorizationEntry, AuthorizedInvocation};
use crate::error::CoreError;

/// The structure whose canonical encoding is hashed and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayloadPreimage {
    pub network_id: Hash32,
    pub nonce: i64,
    pub signature_expiration_ledger: u32,
    pub invocation: AuthorizedInvocation,
}

/// Compute the network id for a passphrase.
pub fn network_id(crypto: &dyn Crypto, network_passphrase: &str) -> Hash32 {
    crypto.hash(network_passphrase.as_bytes())
}

/// Builds network-scoped preimages and hashes them.
#[derive(Clone)]
pub struct PayloadHasher {
    codec: Arc<dyn Codec>,
    crypto: Arc<dyn Crypto>,
    network_id: Hash32,
}

impl PayloadHasher {
    pub fn new(codec: Arc<dyn Codec>, crypto: Arc<dyn Crypto>, network_passphrase: &str) -> Self {
        let network_id = network_id(crypto.as_ref(), network_passphrase);
        Self {
            codec,
            crypto,
            network_id,
        }
    }

    pub fn network_id(&self) -> Hash32 {
        self.network_id
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn crypto(&self) -> &Arc<dyn Crypto> {
        &self.crypto
    }

    /// Build the preimage for `entry` signed until `expiration_ledger`.
    pub fn preimage(
        &self,
        entry: &AuthorizationEntry,
        expiration_ledger: u32,
    ) -> Result<SignaturePayloadPreimage, CoreError> {
        let creds = entry
            .address_credentials()
            .ok_or(CoreError::NotAddressBased)?;
        Ok(SignaturePayloadPreimage {
            network_id: self.network_id,
            nonce: creds.nonce,
            signature_expiration_ledger: expiration_ledger,
            invocation: entry.root_invocation.clone(),
        })
    }

    /// The digest signers must sign for `entry` at `expiration_ledger`.
    ///
    /// Codec rejections are fatal and surface as [`CoreError::Encoding`].
    pub fn hash(
        &self,
        entry: &AuthorizationEntry,
        expiration_ledger: u32,
    ) -> Result<Hash32, CoreError> {
        let preimage = self.preimage(entry, expiration_ledger)?;
        let bytes = self.codec.encode_preimage(&preimage)?;
        Ok(self.crypto.hash(&bytes))
    }

    /// The digest for `entry` at the expiration already in its credentials.
    pub fn hash_current(&self, entry: &AuthorizationEntry) -> Result<Hash32, CoreError> {
        let expiration = entry
            .signature_expiration_ledger()
            .ok_or(CoreError::NotAddressBased)?;
        self.hash(entry, expiration)
    }
}

impl std::fmt::Debug for PayloadHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadHasher")
            .field("network_id", &self.network_id)
            .finish_non_exhaustive()
    }
}
