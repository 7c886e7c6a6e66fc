//! Multi-signer operations on a connected account.
//!
//! ```text
//! simulate -> sign account entries -> re-simulate -> assemble -> submit
//! ```
//!
//! The second simulation runs with the signed entries attached, because the
//! signatures change the resource fee.

use smartauth_signer::Signer;

use crate::context::{bounded, AuthContext};
use crate::discovery::select_signers;
use crate::error::{AuthError, Result};
use crate::events::Event;
use crate::ledger::{AssembledOperation, Operation, SimulationResult, SubmitResult};

/// Sign and submit `operation` for the connected account.
pub async fn execute(
    ctx: &AuthContext,
    operation: Operation,
    signers: &[Signer],
) -> Result<SubmitResult> {
    let snapshot = ctx.session.snapshot().await?;
    let account = snapshot.contract_id;
    let signers = select_signers(ctx.discovery(), ctx.codec.as_ref(), &account, signers).await?;

    let draft = simulate(ctx, &operation).await?;
    tracing::debug!(
        account = %account,
        entries = draft.auth_entries.len(),
        fee = draft.resource_fee,
        "simulated"
    );

    let expiration = ctx.expiration_ledger().await?;
    let mut entries = Vec::with_capacity(draft.auth_entries.len());
    let mut delegated = Vec::new();
    for entry in draft.auth_entries {
        if !entry.is_addressed_to(&account) {
            entries.push(entry);
            continue;
        }
        let signed = ctx.collector.sign_entry(&entry, expiration, &signers).await?;
        if let Some(nonce) = signed.entry.nonce() {
            ctx.events.emit(Event::EntrySigned {
                address: account,
                nonce,
                signers: signers.len(),
            });
        }
        entries.push(signed.entry);
        delegated.extend(signed.delegated_entries);
    }
    entries.extend(delegated);

    let operation = operation.with_auth(entries);
    let resimulated = simulate(ctx, &operation).await?;
    let assembled = AssembledOperation {
        operation,
        resource_fee: resimulated.resource_fee,
        transaction_data: resimulated.transaction_data,
    };

    ctx.session.ensure_current(&snapshot).await?;
    let result = bounded(
        ctx.config.submit_timeout(),
        ctx.ledger.submit(&assembled),
        AuthError::Submission,
    )
    .await?;

    tracing::info!(
        account = %account,
        hash = %result.hash,
        success = result.success,
        fee = assembled.resource_fee,
        "submitted"
    );
    ctx.events.emit(Event::Submitted {
        hash: result.hash.clone(),
        success: result.success,
    });
    Ok(result)
}

async fn simulate(ctx: &AuthContext, operation: &Operation) -> Result<SimulationResult> {
    let result = bounded(
        ctx.config.simulate_timeout(),
        ctx.ledger.simulate(operation),
        AuthError::Simulation,
    )
    .await?;
    match result.error {
        Some(error) => Err(AuthError::Simulation(error)),
        None => Ok(result),
    }
}
