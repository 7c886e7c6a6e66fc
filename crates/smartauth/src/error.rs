//! Error types for authentication flows.

use std::fmt;

use smartauth_core::{ChallengeError, CodecError, CoreError};
use smartauth_signer::SignerError;
use thiserror::Error;

use crate::challenge::FlowState;

/// Failures reported by remote collaborators (ledger RPC, challenge endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete. Callers may retry.
    #[error("network error: {0}")]
    Network(String),

    /// The remote side answered and refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Errors that can occur during authentication and signing flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The challenge failed validation.
    #[error("challenge rejected: {0}")]
    Challenge(#[from] ChallengeError),

    /// A signing pass failed.
    #[error("signing failed: {0}")]
    Signer(#[from] SignerError),

    /// The codec rejected a value.
    #[error("encoding failure: {0}")]
    Encoding(#[from] CodecError),

    /// A remote call did not complete.
    #[error("network failure: {0}")]
    Network(String),

    /// The challenge endpoint returned an error or malformed body.
    #[error("challenge endpoint error: {0}")]
    Endpoint(String),

    /// The ledger rejected a simulation.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// The ledger rejected a submission.
    #[error("submission failed: {0}")]
    Submission(String),

    /// No session is connected, or it changed since the flow began.
    #[error("not connected")]
    NotConnected,

    /// The session token has expired.
    #[error("session expired")]
    SessionExpired,

    /// A challenge flow step was called out of order.
    #[error("invalid transition from {from} to {attempted}")]
    InvalidTransition {
        from: FlowState,
        attempted: FlowState,
    },

    /// The returned token could not be parsed or does not match the principal.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential store failed.
    #[error("credential store error: {0}")]
    Store(String),
}

impl From<CoreError> for AuthError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Encoding(codec) => Self::Encoding(codec),
            other => Self::Signer(SignerError::Core(other)),
        }
    }
}

/// Coarse failure taxonomy for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralViolation,
    IdentityMismatch,
    MissingPrincipalEntry,
    SignatureVerificationFailure,
    SigningCancelled,
    SigningUnavailable,
    SignerFailure,
    EncodingFailure,
    NetworkFailure,
    SimulationFailure,
    SubmissionFailure,
    NotConnected,
    SessionExpired,
    ProtocolViolation,
    Configuration,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl AuthError {
    /// Map this error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Challenge(e) => match e {
                ChallengeError::Structural { .. } => ErrorKind::StructuralViolation,
                ChallengeError::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
                ChallengeError::MissingPrincipalEntry { .. } => ErrorKind::MissingPrincipalEntry,
                ChallengeError::SignatureVerification { .. } => {
                    ErrorKind::SignatureVerificationFailure
                }
                ChallengeError::Encoding(_) => ErrorKind::EncodingFailure,
            },
            Self::Signer(e) => match e {
                SignerError::Cancelled { .. } => ErrorKind::SigningCancelled,
                SignerError::Unavailable { .. } | SignerError::NoSigners { .. } => {
                    ErrorKind::SigningUnavailable
                }
                SignerError::Device { .. }
                | SignerError::Delegate { .. }
                | SignerError::InvalidDelegateEntry { .. } => ErrorKind::SignerFailure,
                SignerError::DuplicateSigner { .. } => ErrorKind::Configuration,
                SignerError::Core(CoreError::Encoding(_)) => ErrorKind::EncodingFailure,
                SignerError::Core(_) => ErrorKind::SignerFailure,
            },
            Self::Encoding(_) => ErrorKind::EncodingFailure,
            Self::Network(_) => ErrorKind::NetworkFailure,
            Self::Endpoint(_) | Self::InvalidTransition { .. } | Self::InvalidToken(_) => {
                ErrorKind::ProtocolViolation
            }
            Self::Simulation(_) => ErrorKind::SimulationFailure,
            Self::Submission(_) => ErrorKind::SubmissionFailure,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Whether the caller may retry. Only network failures qualify.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NetworkFailure
    }

    /// Map a transport failure, classifying refusals with `rejected`.
    pub(crate) fn from_transport(e: TransportError, rejected: fn(String) -> AuthError) -> Self {
        match e {
            TransportError::Network(msg) => Self::Network(msg),
            TransportError::Rejected(msg) => rejected(msg),
        }
    }
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
