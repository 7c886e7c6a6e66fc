//! Signature collection.
//!
//! A collection pass fixes the entry's expiration ledger once, computes one
//! digest, asks every signer in collection order, and folds the results into
//! a signature map sorted by the lowercase hex of each encoded key. Any
//! failure aborts the pass.

use std::collections::HashSet;

use smartauth_core::{
    account_signature_value, hex_sort_key, Address, AuthorizationEntry, CoreError,
    Ed25519PublicKey, Hash32, PayloadHasher, Value,
};

use crate::error::{Result, SignerError};
use crate::signer::{collection_order, Signer, SignerKind};

/// The outcome of signing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEntry {
    /// The entry with its expiration and signature installed.
    pub entry: AuthorizationEntry,
    /// Independently credentialed entries produced by delegated signers.
    pub delegated_entries: Vec<AuthorizationEntry>,
}

/// Folds signer outputs into one canonical signature value per entry.
#[derive(Debug, Clone)]
pub struct SignatureCollector {
    hasher: PayloadHasher,
}

impl SignatureCollector {
    pub fn new(hasher: PayloadHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &PayloadHasher {
        &self.hasher
    }

    /// Sign `entry` with `signers`, valid until `expiration_ledger`.
    ///
    /// Entries addressed to a classic account take a single signature from
    /// the keypair signer holding that account's key. Entries addressed to a
    /// contract get a signature map with one item per signer.
    pub async fn sign_entry(
        &self,
        entry: &AuthorizationEntry,
        expiration_ledger: u32,
        signers: &[Signer],
    ) -> Result<SignedEntry> {
        let address = *entry.address().ok_or(CoreError::NotAddressBased)?;
        if signers.is_empty() {
            return Err(SignerError::NoSigners { address });
        }

        let entry = entry.with_expiration(expiration_ledger);
        let digest = self.hasher.hash(&entry, expiration_ledger)?;

        match address.account_key() {
            Some(key) => self.sign_account_entry(entry, &key, &digest, signers).await,
            None => self.sign_contract_entry(entry, &address, &digest, signers).await,
        }
    }

    async fn sign_account_entry(
        &self,
        entry: AuthorizationEntry,
        key: &Ed25519PublicKey,
        digest: &Hash32,
        signers: &[Signer],
    ) -> Result<SignedEntry> {
        let expected = Value::bytes(key.as_bytes());
        let signer = signers
            .iter()
            .find_map(|s| match s {
                Signer::Digest(d) if d.kind() == SignerKind::Keypair && d.key() == expected => {
                    Some(d)
                }
                _ => None,
            })
            .ok_or_else(|| SignerError::Unavailable {
                principal: Address::account(key).to_string(),
                reason: "no keypair signer holds the account key".into(),
            })?;

        let signature = signer.sign_digest(digest).await?;
        let signature = signature.as_bytes().ok_or(CoreError::InvalidSignature)?;
        Ok(SignedEntry {
            entry: entry.with_signature(account_signature_value(key, signature)),
            delegated_entries: Vec::new(),
        })
    }

    async fn sign_contract_entry(
        &self,
        entry: AuthorizationEntry,
        address: &Address,
        digest: &Hash32,
        signers: &[Signer],
    ) -> Result<SignedEntry> {
        let codec = self.hasher.codec().as_ref();

        // Keys are checked before anyone is prompted.
        let mut seen = HashSet::new();
        let mut keyed = Vec::with_capacity(signers.len());
        for signer in collection_order(signers) {
            let key = signer.key();
            let sort_key = hex_sort_key(codec, &key)?;
            if !seen.insert(sort_key.clone()) {
                return Err(SignerError::DuplicateSigner { key: sort_key });
            }
            keyed.push((sort_key, key, signer));
        }

        tracing::debug!(
            account = %address,
            order = ?keyed.iter().map(|(_, _, s)| s.kind()).collect::<Vec<_>>(),
            "collecting signatures"
        );

        let mut items = Vec::with_capacity(keyed.len());
        let mut delegated_entries = Vec::new();
        for (sort_key, key, signer) in keyed {
            let value = match &signer {
                Signer::Digest(s) => s.sign_digest(digest).await?,
                Signer::Entry(s) => {
                    delegated_entries.push(s.sign_entry(&entry, digest).await?);
                    Value::empty_bytes()
                }
            };
            tracing::debug!(signer = %signer.label(), "signer contributed");
            items.push((sort_key, key, value));
        }

        Ok(SignedEntry {
            entry: entry.with_signature(fold_signature_map(items)),
            delegated_entries,
        })
    }
}

/// Sort `(sort_key, key, value)` items ascending by sort key and build the map.
pub fn fold_signature_map(mut items: Vec<(String, Value, Value)>) -> Value {
    items.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Map(items.into_iter().map(|(_, k, v)| (k, v)).collect())
}
