//! Lazy reconciliation of submitted ledger transactions.

use flexsettle_canonical::TxHandle;
use flexsettle_core::{LedgerAdapter, LedgerError, TxCheck};
use flexsettle_store::{LedgerIndexStore, Mutation, TxScope, TxUpdate};
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::EngineError;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Sub-records that were `submitted` with no fee.
    pub pending: usize,
    /// `check` calls made, one per distinct handle.
    pub checks: usize,
    /// Sub-records advanced to a terminal state.
    pub updated: usize,
}

/// Runs one pass over `scope`.
///
/// Each distinct handle is checked at most once; rows sharing a handle (a
/// settlement batch) share the answer. Every answered check is committed in
/// one `ApplyTxUpdates`, even when other checks in the pass failed. The
/// first check failure is then returned as [`EngineError::LedgerCheck`].
pub fn run_pass<S, L>(store: &S, ledger: &L, scope: &TxScope) -> Result<ReconcileReport, EngineError>
where
    S: LedgerIndexStore + ?Sized,
    L: LedgerAdapter + ?Sized,
{
    let pending = store.pending_transactions(scope)?;
    let mut report = ReconcileReport {
        pending: pending.len(),
        ..ReconcileReport::default()
    };
    if pending.is_empty() {
        return Ok(report);
    }

    let mut answers: HashMap<TxHandle, Option<TxCheck>> = HashMap::new();
    let mut failures: Vec<(TxHandle, LedgerError)> = Vec::new();
    let mut updates = Vec::new();
    for item in &pending {
        let handle = &item.record.handle;
        let answer = answers.entry(handle.clone()).or_insert_with(|| {
            report.checks += 1;
            match ledger.check(handle) {
                Ok(check) => Some(check),
                Err(err) => {
                    tracing::warn!(handle = %handle, error = %err, "transaction check failed");
                    failures.push((handle.clone(), err));
                    None
                }
            }
        });
        if let Some(record) = answer.as_ref().and_then(|check| item.record.advanced(check)) {
            tracing::debug!(
                handle = %handle,
                event_id = %item.target.event_id,
                state = record.state.as_str(),
                "transaction advanced"
            );
            updates.push(TxUpdate {
                target: item.target.clone(),
                record,
            });
        }
    }

    report.updated = updates.len();
    if !updates.is_empty() {
        store.commit(Mutation::ApplyTxUpdates { updates })?;
    }
    tracing::debug!(
        pending = report.pending,
        checks = report.checks,
        updated = report.updated,
        failed = failures.len(),
        "reconciliation pass finished"
    );

    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(report),
        Some((handle, source)) => Err(EngineError::LedgerCheck {
            handle,
            failed,
            checks: report.checks,
            source,
        }),
    }
}
