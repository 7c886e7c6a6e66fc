//! # Smartauth Core
//!
//! Pure primitives for smart-account authentication: authorization entries,
//! canonical encoding, payload hashing, and challenge validation.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over structured ledger values.
//!
//! ## Key Types
//!
//! - [`AuthorizationEntry`] - A signable authorization for one invocation
//! - [`Value`] - Structured ledger value carried in arguments and signatures
//! - [`PayloadHasher`] - Network-scoped digest every signer signs
//! - [`ChallengeParams`] - Expected values a server challenge is checked against
//!
//! ## Canonicalization
//!
//! Payload preimages and signer-map keys are encoded with deterministic CBOR.
//! See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod payload;
pub mod types;
pub mod validation;
pub mod value;

pub use canonical::{hex_sort_key, CborCodec, Codec};
pub use crypto::{Crypto, Ed25519PublicKey, Ed25519Sha256, Ed25519Signature, Hash32, Keypair};
pub use entry::{
    AddressCredentials, AuthorizationEntry, AuthorizedFunction, AuthorizedInvocation,
    CreateContractArgs, Credentials, EntryBuilder, InvokeContractArgs,
};
pub use error::{
    ChallengeError, ChallengeField, CodecError, CoreError, PrincipalRole, SignatureFailure,
    StructuralViolation,
};
pub use payload::{PayloadHasher, SignaturePayloadPreimage};
pub use types::{Address, Principal};
pub use validation::{
    account_signature_value, extract_account_signature, validate_challenge, ChallengeArgs,
    ChallengeParams, ValidatedChallenge, WEB_AUTH_VERIFY_FN,
};
pub use value::Value;
