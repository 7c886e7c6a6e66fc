//! Credential store: maps device credential ids to smart-account contracts.
//!
//! Persistence is the caller's concern. Implementations include platform
//! keychains, browser storage, or the in-memory [`MemoryCredentialStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use smartauth_core::Address;
use thiserror::Error;

/// Errors from a credential store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("credential store: {0}")]
pub struct StoreError(pub String);

/// Result type for credential store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Get/put storage for credential-to-contract mappings.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, credential_id: &str) -> StoreResult<Option<Address>>;

    /// Insert or replace a mapping.
    async fn put(&self, credential_id: &str, contract: Address) -> StoreResult<()>;

    /// Remove a mapping. Returns whether it existed.
    async fn remove(&self, credential_id: &str) -> StoreResult<bool>;
}

/// In-memory credential store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<HashMap<String, Address>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, credential_id: &str) -> StoreResult<Option<Address>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError("lock poisoned".into()))?;
        Ok(inner.get(credential_id).copied())
    }

    async fn put(&self, credential_id: &str, contract: Address) -> StoreResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError("lock poisoned".into()))?;
        inner.insert(credential_id.to_string(), contract);
        Ok(())
    }

    async fn remove(&self, credential_id: &str) -> StoreResult<bool> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError("lock poisoned".into()))?;
        Ok(inner.remove(credential_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get("cred").await.unwrap(), None);

        store.put("cred", Address::Contract([1; 32])).await.unwrap();
        assert_eq!(store.get("cred").await.unwrap(), Some(Address::Contract([1; 32])));

        store.put("cred", Address::Contract([2; 32])).await.unwrap();
        assert_eq!(store.get("cred").await.unwrap(), Some(Address::Contract([2; 32])));

        assert!(store.remove("cred").await.unwrap());
        assert!(!store.remove("cred").await.unwrap());
    }
}
