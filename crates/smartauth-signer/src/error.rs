//! Error types for signature collection.

use smartauth_core::{Address, CodecError, CoreError};
use thiserror::Error;

/// Errors raised while collecting signatures for an entry.
///
/// Any of these aborts the whole signing pass. A partially filled signature
/// map is never returned.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The user declined an interactive prompt.
    #[error("signing cancelled by {signer}")]
    Cancelled { signer: String },

    /// No signer can authorize for a required principal.
    #[error("no capable signer for {principal}: {reason}")]
    Unavailable { principal: String, reason: String },

    /// The device authenticator failed for a reason other than cancellation.
    #[error("device signer {signer} failed: {reason}")]
    Device { signer: String, reason: String },

    /// The delegate wallet failed to produce an entry.
    #[error("delegate {delegate} failed: {reason}")]
    Delegate { delegate: Address, reason: String },

    /// The delegate wallet returned an entry that does not match the request.
    #[error("delegate {delegate} returned an invalid entry: {reason}")]
    InvalidDelegateEntry {
        delegate: Address,
        reason: &'static str,
    },

    /// Two signers would occupy the same signature-map key.
    #[error("duplicate signer key {key}")]
    DuplicateSigner { key: String },

    /// A signing pass was started with no signers.
    #[error("no signers supplied for {address}")]
    NoSigners { address: Address },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<CodecError> for SignerError {
    fn from(e: CodecError) -> Self {
        Self::Core(CoreError::Encoding(e))
    }
}

/// Result type for signer operations.
pub type Result<T> = std::result::Result<T, SignerError>;
