//! In-memory ledger RPC.
//!
//! Simulating an operation without auth entries returns the configured draft
//! entries. Simulating one that carries entries reports a fee that grows
//! with the encoded size of those entries, the way signatures raise the real
//! resource cost.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use smartauth::{
    AssembledOperation, LedgerClient, LedgerResult, Operation, SimulationResult, SubmitResult,
    TransportError,
};
use smartauth_core::{AuthorizationEntry, CborCodec, Codec};

/// Fee reported for a draft simulation.
pub const BASE_FEE: i64 = 100;

/// A scripted ledger that records every call.
#[derive(Debug, Default)]
pub struct MockLedger {
    latest: AtomicU32,
    draft: Mutex<Vec<AuthorizationEntry>>,
    simulation_error: Mutex<Option<String>>,
    submit_error: Mutex<Option<TransportError>>,
    simulated: Mutex<Vec<Operation>>,
    submitted: Mutex<Vec<AssembledOperation>>,
}

impl MockLedger {
    pub fn new(latest_ledger: u32) -> Self {
        Self {
            latest: AtomicU32::new(latest_ledger),
            ..Self::default()
        }
    }

    /// Entries returned by the next draft simulations.
    pub fn set_draft(&self, entries: Vec<AuthorizationEntry>) {
        *self.draft.lock().unwrap() = entries;
    }

    /// Make simulations report `error`.
    pub fn fail_simulation(&self, error: impl Into<String>) {
        *self.simulation_error.lock().unwrap() = Some(error.into());
    }

    pub fn fail_submission(&self, error: TransportError) {
        *self.submit_error.lock().unwrap() = Some(error);
    }

    pub fn set_latest_ledger(&self, latest: u32) {
        self.latest.store(latest, Ordering::SeqCst);
    }

    /// Every simulated operation, in call order.
    pub fn simulated(&self) -> Vec<Operation> {
        self.simulated.lock().unwrap().clone()
    }

    /// Every submitted operation, in call order.
    pub fn submitted(&self) -> Vec<AssembledOperation> {
        self.submitted.lock().unwrap().clone()
    }

    fn fee_for(entries: &[AuthorizationEntry]) -> i64 {
        let size: usize = entries
            .iter()
            .filter_map(|e| CborCodec.encode_entry(e).ok())
            .map(|b| b.len())
            .sum();
        BASE_FEE + size as i64
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_ledger_sequence(&self) -> LedgerResult<u32> {
        Ok(self.latest.load(Ordering::SeqCst))
    }

    async fn simulate(&self, operation: &Operation) -> LedgerResult<SimulationResult> {
        self.simulated.lock().unwrap().push(operation.clone());
        if let Some(error) = self.simulation_error.lock().unwrap().clone() {
            return Ok(SimulationResult {
                error: Some(error),
                ..SimulationResult::default()
            });
        }

        if operation.auth_entries.is_empty() {
            Ok(SimulationResult {
                auth_entries: self.draft.lock().unwrap().clone(),
                resource_fee: BASE_FEE,
                transaction_data: Bytes::from_static(b"draft"),
                error: None,
            })
        } else {
            Ok(SimulationResult {
                auth_entries: operation.auth_entries.clone(),
                resource_fee: Self::fee_for(&operation.auth_entries),
                transaction_data: Bytes::from_static(b"signed"),
                error: None,
            })
        }
    }

    async fn submit(&self, operation: &AssembledOperation) -> LedgerResult<SubmitResult> {
        if let Some(error) = self.submit_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(operation.clone());
        Ok(SubmitResult {
            hash: format!("{:064x}", submitted.len()),
            success: true,
        })
    }
}
