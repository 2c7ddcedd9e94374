use flexsettle_canonical::TxHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::ConfirmMode;
use crate::now_utc;
use crate::tx::{TxCheck, TxOutcome, TxResult};

/// Ledger actions mirrored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Event creation.
    CreateEvent,
    /// Event close.
    CloseEvent,
    /// Proof submission.
    SubmitProof,
    /// Batch settlement.
    SettleEvent,
    /// Reward claim.
    ClaimReward,
}

impl LedgerAction {
    /// Stable snake_case name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerAction::CreateEvent => "create_event",
            LedgerAction::CloseEvent => "close_event",
            LedgerAction::SubmitProof => "submit_proof",
            LedgerAction::SettleEvent => "settle_event",
            LedgerAction::ClaimReward => "claim_reward",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached or timed out.
    #[error("ledger transport failed: {0}")]
    Transport(String),
    /// The ledger answered with something that is not a valid result
    /// (missing handle, unknown state).
    #[error("ledger response malformed: {0}")]
    Malformed(String),
    /// The ledger refused the action.
    #[error("ledger rejected the action: {0}")]
    Rejected(String),
}

/// Capability to record actions on the external settlement ledger.
///
/// Both calls block until the ledger answers. Implementations do not retry
/// internally.
pub trait LedgerAdapter: Send + Sync {
    /// Submits `action` with its payload. In [`ConfirmMode::Sync`] the
    /// returned outcome is terminal; in [`ConfirmMode::Hybrid`] it may be
    /// [`TxOutcome::Submitted`].
    fn submit(
        &self,
        action: LedgerAction,
        payload: &Value,
        mode: ConfirmMode,
    ) -> Result<TxResult, LedgerError>;

    /// Re-queries a handle. Idempotent; terminal handles restate their
    /// terminal outcome.
    fn check(&self, handle: &TxHandle) -> Result<TxCheck, LedgerError>;
}

impl<L: LedgerAdapter + ?Sized> LedgerAdapter for Arc<L> {
    fn submit(
        &self,
        action: LedgerAction,
        payload: &Value,
        mode: ConfirmMode,
    ) -> Result<TxResult, LedgerError> {
        (**self).submit(action, payload, mode)
    }

    fn check(&self, handle: &TxHandle) -> Result<TxCheck, LedgerError> {
        (**self).check(handle)
    }
}

/// In-process ledger stand-in with zero fees.
///
/// Sync submissions confirm immediately. Hybrid submissions stay
/// `submitted` until they have been checked `checks_until_confirm` times.
/// Handles it never issued check as confirmed.
#[derive(Debug)]
pub struct SimulatedLedger {
    sequence: AtomicU64,
    checks_until_confirm: u32,
    pending: Mutex<HashMap<TxHandle, u32>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SimulatedLedger {
    /// Creates a ledger whose hybrid submissions confirm on the
    /// `checks_until_confirm`-th check (0 confirms at submit time).
    pub fn new(checks_until_confirm: u32) -> Self {
        Self {
            sequence: AtomicU64::new(0),
            checks_until_confirm,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn next_handle(&self, action: LedgerAction, payload: &Value) -> TxHandle {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(action.as_str().as_bytes());
        hasher.update(payload.to_string().as_bytes());
        hasher.update(seq.to_le_bytes());
        hasher.update(now_utc().timestamp().to_le_bytes());
        TxHandle::new(format!("0x{}", hex::encode(hasher.finalize())))
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TxHandle, u32>>, LedgerError> {
        self.pending
            .lock()
            .map_err(|_| LedgerError::Transport("simulated ledger state poisoned".to_string()))
    }
}

impl LedgerAdapter for SimulatedLedger {
    fn submit(
        &self,
        action: LedgerAction,
        payload: &Value,
        mode: ConfirmMode,
    ) -> Result<TxResult, LedgerError> {
        let handle = self.next_handle(action, payload);
        let now = now_utc();
        let confirm_now = mode == ConfirmMode::Sync || self.checks_until_confirm == 0;
        let (outcome, fee_wei) = if confirm_now {
            (TxOutcome::Confirmed { confirmed_at: now }, Some(0))
        } else {
            self.pending()?.insert(handle.clone(), 0);
            (TxOutcome::Submitted, None)
        };
        tracing::debug!(action = %action, handle = %handle, state = outcome.state().as_str(), "simulated ledger submit");
        Ok(TxResult {
            handle,
            fee_wei,
            outcome,
            submitted_at: now,
        })
    }

    fn check(&self, handle: &TxHandle) -> Result<TxCheck, LedgerError> {
        let mut pending = self.pending()?;
        let confirmed = match pending.get_mut(handle) {
            None => true,
            Some(seen) => {
                *seen += 1;
                *seen >= self.checks_until_confirm
            }
        };
        if !confirmed {
            return Ok(TxCheck {
                fee_wei: None,
                outcome: TxOutcome::Submitted,
            });
        }
        pending.remove(handle);
        Ok(TxCheck {
            fee_wei: Some(0),
            outcome: TxOutcome::Confirmed {
                confirmed_at: now_utc(),
            },
        })
    }
}
