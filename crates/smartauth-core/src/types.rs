//! Strong type definitions for ledger principals.
//!
//! Addresses are compared purely on their variant tag and 32 raw bytes.
//! Human-facing encodings (strkeys and the like) are produced outside this
//! crate and carried alongside the raw address in [`Principal`].

use std::fmt;

use crate::crypto::Ed25519PublicKey;

/// A ledger address: either a classic keypair account or a contract.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    /// A classic account identified by its Ed25519 public key.
    Account([u8; 32]),
    /// A contract identified by its 32-byte contract hash.
    Contract([u8; 32]),
}

impl Address {
    /// Create an account address from a public key.
    pub const fn account(key: &Ed25519PublicKey) -> Self {
        Self::Account(key.0)
    }

    /// Get the raw bytes, regardless of variant.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        match self {
            Self::Account(bytes) | Self::Contract(bytes) => bytes,
        }
    }

    /// Numeric tag used by the canonical encoding.
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Account(_) => 0,
            Self::Contract(_) => 1,
        }
    }

    pub const fn is_account(&self) -> bool {
        matches!(self, Self::Account(_))
    }

    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// The account's public key, if this is an account address.
    pub fn account_key(&self) -> Option<Ed25519PublicKey> {
        match self {
            Self::Account(bytes) => Some(Ed25519PublicKey(*bytes)),
            Self::Contract(_) => None,
        }
    }

    /// Convert the raw bytes to hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Contract(_) => "contract",
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address::{}({})", self.kind(), &self.to_hex()[..16])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.to_hex())
    }
}

/// A ledger address paired with its external textual identifier.
///
/// Challenge arguments carry identifiers as strings while credentials carry
/// raw addresses, so the validator needs both views of the same principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub address: Address,
    pub id: String,
}

impl Principal {
    pub fn new(address: Address, id: impl Into<String>) -> Self {
        Self {
            address,
            id: id.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_includes_variant() {
        let account = Address::Account([0x11; 32]);
        let contract = Address::Contract([0x11; 32]);
        assert_ne!(account, contract);
        assert_eq!(account.as_bytes(), contract.as_bytes());
        assert_eq!(account, Address::Account([0x11; 32]));
    }

    #[test]
    fn test_ordering_is_tag_then_bytes() {
        let a = Address::Account([0xff; 32]);
        let c = Address::Contract([0x00; 32]);
        assert!(a < c);
        assert!(Address::Contract([0x01; 32]) < Address::Contract([0x02; 32]));
    }

    #[test]
    fn test_account_key() {
        let key = Ed25519PublicKey::from_bytes([0x42; 32]);
        assert_eq!(Address::account(&key).account_key(), Some(key));
        assert_eq!(Address::Contract([0x42; 32]).account_key(), None);
    }

    #[test]
    fn test_display() {
        let addr = Address::Contract([0xab; 32]);
        assert!(format!("{}", addr).starts_with("contract:abab"));
        assert!(format!("{:?}", addr).starts_with("Address::contract("));
    }
}
