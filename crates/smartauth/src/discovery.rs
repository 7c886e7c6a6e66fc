//! Signer discovery.
//!
//! Before a signing pass, the account's registered signers are looked up so
//! unregistered ones are not prompted. When the lookup fails every supplied
//! signer is used: interactive signers are still prompted rather than
//! silently skipped.

use async_trait::async_trait;
use smartauth_core::{hex_sort_key, Address, Codec, Value};
use smartauth_signer::{Signer, SignerError};
use std::collections::HashSet;

use crate::error::{AuthError, Result, TransportError};

/// Looks up the signer keys registered on a smart account.
#[async_trait]
pub trait SignerDiscovery: Send + Sync {
    /// Signature-map keys registered on `account`.
    async fn registered_signers(
        &self,
        account: &Address,
    ) -> std::result::Result<Vec<Value>, TransportError>;
}

/// Keep the supplied signers that are registered on `account`.
///
/// Falls back to every supplied signer when discovery is absent or fails.
/// Fails with `SigningUnavailable` when discovery succeeds and none of the
/// supplied signers are registered.
pub async fn select_signers(
    discovery: Option<&dyn SignerDiscovery>,
    codec: &dyn Codec,
    account: &Address,
    signers: &[Signer],
) -> Result<Vec<Signer>> {
    let Some(discovery) = discovery else {
        return Ok(signers.to_vec());
    };

    let registered = match discovery.registered_signers(account).await {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(
                account = %account,
                error = %e,
                "signer discovery failed, using all supplied signers"
            );
            return Ok(signers.to_vec());
        }
    };

    let registered: HashSet<String> = registered
        .iter()
        .map(|key| hex_sort_key(codec, key))
        .collect::<std::result::Result<_, _>>()?;

    let mut selected = Vec::with_capacity(signers.len());
    for signer in signers {
        if registered.contains(&hex_sort_key(codec, &signer.key())?) {
            selected.push(signer.clone());
        } else {
            tracing::debug!(signer = %signer.label(), "skipping unregistered signer");
        }
    }

    if selected.is_empty() && !signers.is_empty() {
        return Err(AuthError::Signer(SignerError::Unavailable {
            principal: account.to_string(),
            reason: "none of the supplied signers is registered on the account".into(),
        }));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartauth_core::{CborCodec, Hash32, Keypair};
    use smartauth_signer::{DigestSigner, KeypairSigner, SignerKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ACCOUNT: Address = Address::Contract([0xc1; 32]);

    struct Fixed(std::result::Result<Vec<Value>, TransportError>);

    #[async_trait]
    impl SignerDiscovery for Fixed {
        async fn registered_signers(
            &self,
            _account: &Address,
        ) -> std::result::Result<Vec<Value>, TransportError> {
            self.0.clone()
        }
    }

    /// An interactive signer that counts prompts.
    struct Prompt(AtomicUsize);

    #[async_trait]
    impl DigestSigner for Prompt {
        fn key(&self) -> Value {
            Value::symbol("prompt")
        }

        fn kind(&self) -> SignerKind {
            SignerKind::Device
        }

        async fn sign_digest(&self, _digest: &Hash32) -> smartauth_signer::Result<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Void)
        }
    }

    fn keypair(seed: u8) -> Signer {
        Signer::digest(KeypairSigner::new(Keypair::from_seed(&[seed; 32])))
    }

    #[tokio::test]
    async fn test_unregistered_signers_skipped() {
        let a = keypair(1);
        let b = keypair(2);
        let discovery = Fixed(Ok(vec![a.key()]));
        let selected = select_signers(Some(&discovery), &CborCodec, &ACCOUNT, &[a.clone(), b])
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key(), a.key());
    }

    #[tokio::test]
    async fn test_none_registered_is_unavailable() {
        let discovery = Fixed(Ok(vec![]));
        let err = select_signers(Some(&discovery), &CborCodec, &ACCOUNT, &[keypair(1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::SigningUnavailable);
    }

    #[tokio::test]
    async fn test_discovery_failure_still_prompts() {
        let prompt = Arc::new(Prompt(AtomicUsize::new(0)));
        let signers = vec![Signer::Digest(prompt.clone()), keypair(1)];
        let discovery = Fixed(Err(TransportError::Network("unreachable".into())));

        let selected = select_signers(Some(&discovery), &CborCodec, &ACCOUNT, &signers)
            .await
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().any(Signer::is_interactive));

        if let Signer::Digest(s) = &selected[0] {
            s.sign_digest(&Hash32::from_bytes([0; 32])).await.unwrap();
        }
        assert_eq!(prompt.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_discovery_uses_all() {
        let selected = select_signers(None, &CborCodec, &ACCOUNT, &[keypair(1), keypair(2)])
            .await
            .unwrap();
        assert_eq!(selected.len(), 2);
    }
}
