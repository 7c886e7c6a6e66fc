//! Structured ledger values.
//!
//! [`Value`] is the dynamically-typed value carried in invocation arguments,
//! signer keys and signature payloads. Maps keep their entries in the order
//! they were built; canonical ordering is the encoder's job.

use bytes::Bytes;

use crate::types::Address;

/// A structured ledger value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Void,
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    Bytes(Bytes),
    String(String),
    Symbol(String),
    Address(Address),
    Vec(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        Self::Bytes(Bytes::copy_from_slice(b.as_ref()))
    }

    /// An empty byte string, used as a placeholder signature.
    pub fn empty_bytes() -> Self {
        Self::Bytes(Bytes::new())
    }

    /// Text content of a `String` or `Symbol`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_vec(&self) -> Option<&[Value]> {
        match self {
            Self::Vec(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Look up a map entry by string or symbol key.
    ///
    /// Returns `None` for non-map values and for missing keys.
    pub fn map_get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// The first string or symbol key that occurs more than once.
    pub fn repeated_map_key(&self) -> Option<&str> {
        let entries = self.as_map()?;
        let mut seen = std::collections::HashSet::new();
        entries
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .find(|key| !seen.insert(*key))
    }

    /// Whether every key of this map is a string or symbol.
    pub fn is_string_keyed_map(&self) -> bool {
        match self {
            Self::Map(entries) => entries.iter().all(|(k, _)| k.as_str().is_some()),
            _ => false,
        }
    }
}

impl From<Address> for Value {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::U32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::I64(n)
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Self::I128(n)
    }
}
