//! Error types for smartauth core.

use std::fmt;

use thiserror::Error;

use crate::types::Address;

/// Errors from the canonical codec.
///
/// These are fatal: a codec rejecting a value means the peers disagree on the
/// protocol version, not that something transient went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unsupported value: {0}")]
    Unsupported(String),

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("decoding error: {0}")]
    Decode(String),
}

impl CodecError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Core errors for signature and payload operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("entry has no address credentials")]
    NotAddressBased,

    #[error("encoding failure: {0}")]
    Encoding(#[from] CodecError),
}

/// The principal an entry is expected to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalRole {
    Server,
    Client,
    ClientDomain,
}

impl fmt::Display for PrincipalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Server => "server",
            Self::Client => "client",
            Self::ClientDomain => "client domain",
        })
    }
}

/// A challenge argument compared against an expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeField {
    Account,
    HomeDomain,
    WebAuthDomain,
    WebAuthDomainAccount,
    ClientDomainAccount,
    Nonce,
}

impl fmt::Display for ChallengeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::HomeDomain => "home_domain",
            Self::WebAuthDomain => "web_auth_domain",
            Self::WebAuthDomainAccount => "web_auth_domain_account",
            Self::ClientDomainAccount => "client_domain_account",
            Self::Nonce => "nonce",
        })
    }
}

/// Malformed or misdirected challenge entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("challenge contains no entries")]
    EmptyEntryList,

    #[error("root invocation has {count} sub-invocations")]
    NonEmptySubInvocations { count: usize },

    #[error("authorized function is not a contract call")]
    NotContractFunction,

    #[error("contract address is {actual}, expected {expected}")]
    WrongContract { expected: Address, actual: Address },

    #[error("function name is `{actual}`, expected `{expected}`")]
    WrongFunction { expected: String, actual: String },

    #[error("first argument is not a string-keyed map")]
    MissingArgumentMap,

    #[error("argument `{key}` is missing")]
    MissingArgument { key: &'static str },

    #[error("argument `{key}` is not a string")]
    MalformedArgument { key: &'static str },

    #[error("argument `{key}` appears more than once")]
    DuplicateArgument { key: String },

    #[error("entry uses source-account credentials")]
    NotAddressBased,

    #[error("more than one entry addresses the {role} principal")]
    DuplicatePrincipalEntry { role: PrincipalRole },

    #[error("entry addresses unexpected principal {address}")]
    UnexpectedPrincipal { address: Address },
}

/// Why the server entry's signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFailure {
    /// The entry carries no signature.
    Missing,
    /// The signature value has the wrong shape.
    Malformed,
    /// The embedded public key is not the server signing key.
    PublicKeyMismatch,
    /// The signature does not verify over the payload hash.
    Invalid,
}

impl fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "signature missing",
            Self::Malformed => "signature malformed",
            Self::PublicKeyMismatch => "public key does not match server signing key",
            Self::Invalid => "signature does not verify",
        })
    }
}

/// A challenge rejected by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("structural violation in {}: {violation}", entry_position(.index))]
    Structural {
        index: Option<usize>,
        violation: StructuralViolation,
    },

    #[error("{field} mismatch in entry {index}: expected `{expected}`, got `{actual}`")]
    IdentityMismatch {
        index: usize,
        field: ChallengeField,
        expected: String,
        actual: String,
    },

    #[error("no entry addresses the {role} principal {principal}")]
    MissingPrincipalEntry {
        role: PrincipalRole,
        principal: String,
    },

    #[error("server entry signature rejected for {principal}: {reason}")]
    SignatureVerification {
        principal: String,
        reason: SignatureFailure,
    },

    #[error("encoding failure: {0}")]
    Encoding(#[from] CodecError),
}

impl ChallengeError {
    pub(crate) fn structural(index: usize, violation: StructuralViolation) -> Self {
        Self::Structural {
            index: Some(index),
            violation,
        }
    }
}

impl From<CoreError> for ChallengeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Encoding(codec) => ChallengeError::Encoding(codec),
            CoreError::NotAddressBased => ChallengeError::Structural {
                index: None,
                violation: StructuralViolation::NotAddressBased,
            },
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ChallengeError::SignatureVerification {
                    principal: String::from("server"),
                    reason: SignatureFailure::Invalid,
                }
            }
        }
    }
}

fn entry_position(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("entry {}", i),
        None => String::from("challenge"),
    }
}
