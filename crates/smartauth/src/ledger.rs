//! Ledger RPC collaborator.
//!
//! The RPC service is reached through [`LedgerClient`]. Implementations may
//! use JSON-RPC over HTTP or anything else; this crate only sees typed
//! operations and results.

use async_trait::async_trait;
use bytes::Bytes;
use smartauth_core::{AuthorizationEntry, InvokeContractArgs};

use crate::error::TransportError;

/// Result type for ledger calls.
pub type LedgerResult<T> = std::result::Result<T, TransportError>;

/// A contract call and the authorization entries attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub invocation: InvokeContractArgs,
    pub auth_entries: Vec<AuthorizationEntry>,
}

impl Operation {
    pub fn new(invocation: InvokeContractArgs) -> Self {
        Self {
            invocation,
            auth_entries: Vec::new(),
        }
    }

    pub fn with_auth(mut self, auth_entries: Vec<AuthorizationEntry>) -> Self {
        self.auth_entries = auth_entries;
        self
    }
}

/// What a dry run reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulationResult {
    /// Draft entries the operation needs authorized.
    pub auth_entries: Vec<AuthorizationEntry>,
    pub resource_fee: i64,
    /// Opaque resource footprint to attach to the final transaction.
    pub transaction_data: Bytes,
    /// Set when the ledger would reject the operation.
    pub error: Option<String>,
}

/// An operation ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOperation {
    pub operation: Operation,
    pub resource_fee: i64,
    pub transaction_data: Bytes,
}

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub hash: String,
    pub success: bool,
}

/// Ledger query, simulation and submission service.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Height of the most recently closed ledger.
    async fn latest_ledger_sequence(&self) -> LedgerResult<u32>;

    /// Dry-run `operation`.
    async fn simulate(&self, operation: &Operation) -> LedgerResult<SimulationResult>;

    /// Submit an assembled operation.
    async fn submit(&self, operation: &AssembledOperation) -> LedgerResult<SubmitResult>;
}
