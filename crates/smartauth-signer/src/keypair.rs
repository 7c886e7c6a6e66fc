//! Local keypair signer.

use std::sync::Arc;

use async_trait::async_trait;
use smartauth_core::{Crypto, Ed25519PublicKey, Ed25519Sha256, Hash32, Keypair, Value};

use crate::error::Result;
use crate::signer::{DigestSigner, SignerKind};

/// Signs digests synchronously with a locally held Ed25519 key.
///
/// Occupies the map key `Bytes(public_key)` and contributes `Bytes(signature)`.
#[derive(Clone)]
pub struct KeypairSigner {
    keypair: Keypair,
    crypto: Arc<dyn Crypto>,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self::with_crypto(keypair, Arc::new(Ed25519Sha256))
    }

    pub fn with_crypto(keypair: Keypair, crypto: Arc<dyn Crypto>) -> Self {
        Self { keypair, crypto }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("public_key", &self.public_key())
            .finish()
    }
}

#[async_trait]
impl DigestSigner for KeypairSigner {
    fn key(&self) -> Value {
        Value::bytes(self.public_key().as_bytes())
    }

    fn kind(&self) -> SignerKind {
        SignerKind::Keypair
    }

    async fn sign_digest(&self, digest: &Hash32) -> Result<Value> {
        let signature = self.crypto.sign(digest.as_bytes(), &self.keypair);
        Ok(Value::bytes(signature.as_bytes()))
    }
}
