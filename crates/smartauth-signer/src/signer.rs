//! Signer capability interfaces.
//!
//! Two interfaces, split by what they return:
//! - [`DigestSigner`] produces signature material for a 32-byte digest.
//! - [`EntrySigner`] produces an entirely separate, independently
//!   credentialed entry. The primary entry only gets a placeholder.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use smartauth_core::{AuthorizationEntry, Hash32, Value};

use crate::error::Result;

/// Signer-map key prefix for device-bound signers.
pub const EXTERNAL_KEY_TAG: &str = "External";

/// Signer-map key prefix for delegated signers.
pub const DELEGATED_KEY_TAG: &str = "Delegated";

/// The mechanism a signer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignerKind {
    /// Interactive, device-bound. Collected first.
    Device,
    /// Local keypair. Silent.
    Keypair,
    /// External delegate producing its own entry. Collected last.
    Delegated,
}

impl fmt::Display for SignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Device => "device",
            Self::Keypair => "keypair",
            Self::Delegated => "delegated",
        })
    }
}

/// Signs a payload digest directly.
#[async_trait]
pub trait DigestSigner: Send + Sync {
    /// The key this signer occupies in a signature map.
    fn key(&self) -> Value;

    fn kind(&self) -> SignerKind;

    /// Produce the signature-map value for `digest`.
    ///
    /// Interactive implementations may suspend indefinitely and must report
    /// cancellation as [`SignerError::Cancelled`](crate::SignerError::Cancelled).
    async fn sign_digest(&self, digest: &Hash32) -> Result<Value>;
}

/// Authorizes by producing its own entry.
#[async_trait]
pub trait EntrySigner: Send + Sync {
    /// The key this signer occupies in a signature map.
    fn key(&self) -> Value;

    /// Produce an independently signed entry for `entry`.
    ///
    /// `entry` already carries its final nonce and expiration; `digest` is
    /// its payload hash.
    async fn sign_entry(
        &self,
        entry: &AuthorizationEntry,
        digest: &Hash32,
    ) -> Result<AuthorizationEntry>;
}

/// A signer of either shape.
#[derive(Clone)]
pub enum Signer {
    Digest(Arc<dyn DigestSigner>),
    Entry(Arc<dyn EntrySigner>),
}

impl Signer {
    pub fn digest(signer: impl DigestSigner + 'static) -> Self {
        Self::Digest(Arc::new(signer))
    }

    pub fn entry(signer: impl EntrySigner + 'static) -> Self {
        Self::Entry(Arc::new(signer))
    }

    /// The signature-map key.
    pub fn key(&self) -> Value {
        match self {
            Self::Digest(s) => s.key(),
            Self::Entry(s) => s.key(),
        }
    }

    pub fn kind(&self) -> SignerKind {
        match self {
            Self::Digest(s) => s.kind(),
            Self::Entry(_) => SignerKind::Delegated,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.kind() == SignerKind::Device
    }

    /// Short label for logs and error messages.
    pub fn label(&self) -> String {
        describe_key(&self.key(), self.kind())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signer").field(&self.label()).finish()
    }
}

/// Order signers for a collection pass: interactive first, then silent
/// keypairs, then delegates. Stable within each group.
pub fn collection_order(signers: &[Signer]) -> Vec<Signer> {
    let mut ordered = signers.to_vec();
    ordered.sort_by_key(Signer::kind);
    ordered
}

fn describe_key(key: &Value, kind: SignerKind) -> String {
    let detail = match (kind, key) {
        (SignerKind::Keypair, Value::Bytes(pk)) => hex::encode(&pk[..pk.len().min(8)]),
        (_, Value::Vec(parts)) => parts
            .get(1)
            .and_then(Value::as_address)
            .map(|a| a.to_hex()[..16].to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    format!("{}:{}", kind, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartauth_core::Address;

    struct Fixed(SignerKind, Value);

    #[async_trait]
    impl DigestSigner for Fixed {
        fn key(&self) -> Value {
            self.1.clone()
        }

        fn kind(&self) -> SignerKind {
            self.0
        }

        async fn sign_digest(&self, _digest: &Hash32) -> Result<Value> {
            Ok(Value::Void)
        }
    }

    struct Delegate;

    #[async_trait]
    impl EntrySigner for Delegate {
        fn key(&self) -> Value {
            Value::Vec(vec![
                Value::symbol(DELEGATED_KEY_TAG),
                Value::Address(Address::Contract([9; 32])),
            ])
        }

        async fn sign_entry(
            &self,
            entry: &AuthorizationEntry,
            _digest: &Hash32,
        ) -> Result<AuthorizationEntry> {
            Ok(entry.clone())
        }
    }

    #[test]
    fn test_collection_order() {
        let signers = vec![
            Signer::entry(Delegate),
            Signer::digest(Fixed(SignerKind::Keypair, Value::bytes([1]))),
            Signer::digest(Fixed(SignerKind::Device, Value::bytes([2]))),
            Signer::digest(Fixed(SignerKind::Keypair, Value::bytes([3]))),
        ];
        let kinds: Vec<_> = collection_order(&signers).iter().map(Signer::kind).collect();
        assert_eq!(
            kinds,
            vec![
                SignerKind::Device,
                SignerKind::Keypair,
                SignerKind::Keypair,
                SignerKind::Delegated
            ]
        );

        // Stable within a group.
        let ordered = collection_order(&signers);
        assert_eq!(ordered[1].key(), Value::bytes([1]));
        assert_eq!(ordered[2].key(), Value::bytes([3]));
    }

    #[test]
    fn test_labels() {
        assert!(Signer::entry(Delegate).label().starts_with("delegated:0909"));
        assert!(Signer::digest(Fixed(SignerKind::Keypair, Value::bytes([0xab; 32])))
            .label()
            .starts_with("keypair:abab"));
        assert!(Signer::digest(Fixed(SignerKind::Device, Value::Void)).is_interactive());
    }
}
