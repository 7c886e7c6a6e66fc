//! # Smartauth Signer
//!
//! Signer capabilities and signature-map collection.
//!
//! Three signer variants are provided:
//!
//! - [`KeypairSigner`] - Local Ed25519 key, silent
//! - [`DeviceSigner`] - Interactive device-bound key, cancellable
//! - [`DelegatedSigner`] - External delegate that authorizes through its own entry
//!
//! [`SignatureCollector`] runs a signing pass over one entry and installs the
//! resulting signature map.

pub mod collector;
pub mod delegated;
pub mod device;
pub mod error;
pub mod keypair;
pub mod signer;

pub use collector::{fold_signature_map, SignatureCollector, SignedEntry};
pub use delegated::{is_check_auth_for, DelegateError, DelegateWallet, DelegatedSigner, CHECK_AUTH_FN};
pub use device::{DeviceAssertion, DeviceAuthenticator, DeviceError, DeviceSigner};
pub use error::{Result, SignerError};
pub use keypair::KeypairSigner;
pub use signer::{
    collection_order, DigestSigner, EntrySigner, Signer, SignerKind, DELEGATED_KEY_TAG,
    EXTERNAL_KEY_TAG,
};
