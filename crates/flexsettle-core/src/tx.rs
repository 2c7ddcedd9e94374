use chrono::{DateTime, Utc};
use flexsettle_canonical::TxHandle;
use serde::{Deserialize, Serialize};

/// Confirmation state of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    /// Accepted by the ledger, confirmation not yet observed.
    Submitted,
    /// Confirmed on the ledger. Terminal.
    Confirmed,
    /// Rejected or reverted on the ledger. Terminal.
    Failed,
}

impl TxState {
    /// Terminal states are never re-queried.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Failed)
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            TxState::Submitted => "submitted",
            TxState::Confirmed => "confirmed",
            TxState::Failed => "failed",
        }
    }
}

/// Outcome reported by the ledger for one transaction.
///
/// `confirmed_at` and `error` only exist in the state they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TxOutcome {
    /// Still pending.
    Submitted,
    /// Confirmed at the given instant.
    Confirmed {
        /// Confirmation instant.
        confirmed_at: DateTime<Utc>,
    },
    /// Failed with a ledger-provided reason.
    Failed {
        /// Failure detail.
        error: String,
    },
}

impl TxOutcome {
    /// State of this outcome.
    pub fn state(&self) -> TxState {
        match self {
            TxOutcome::Submitted => TxState::Submitted,
            TxOutcome::Confirmed { .. } => TxState::Confirmed,
            TxOutcome::Failed { .. } => TxState::Failed,
        }
    }
}

/// Result of submitting an action to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    /// Ledger transaction handle.
    pub handle: TxHandle,
    /// Fee in wei, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_wei: Option<u128>,
    /// Confirmation outcome at the time the call returned.
    pub outcome: TxOutcome,
    /// Instant the ledger accepted the transaction.
    pub submitted_at: DateTime<Utc>,
}

/// Result of re-querying an existing transaction handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCheck {
    /// Fee in wei, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_wei: Option<u128>,
    /// Current outcome.
    pub outcome: TxOutcome,
}

/// Transaction-lifecycle sub-record embedded in events, proofs and settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Ledger transaction handle.
    pub handle: TxHandle,
    /// Fee in wei, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_wei: Option<u128>,
    /// Current state.
    pub state: TxState,
    /// Submission instant.
    pub submitted_at: DateTime<Utc>,
    /// Present only when `state == confirmed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Present only when `state == failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TxRecord {
    /// Builds the record persisted right after a successful submit.
    pub fn from_result(result: TxResult) -> Self {
        let (confirmed_at, error) = split_outcome(&result.outcome);
        Self {
            handle: result.handle,
            fee_wei: result.fee_wei,
            state: result.outcome.state(),
            submitted_at: result.submitted_at,
            confirmed_at,
            error,
        }
    }

    /// Whether reconciliation should re-query this record: still submitted
    /// and no fee observed yet.
    pub fn needs_reconcile(&self) -> bool {
        self.state == TxState::Submitted && self.fee_wei.is_none()
    }

    /// Applies a check result. Returns `None` when the check does not move
    /// the record (still submitted, or the record is already terminal).
    pub fn advanced(&self, check: &TxCheck) -> Option<TxRecord> {
        if self.state.is_terminal() {
            return None;
        }
        let state = check.outcome.state();
        if state == TxState::Submitted {
            return None;
        }
        let (confirmed_at, error) = split_outcome(&check.outcome);
        Some(TxRecord {
            handle: self.handle.clone(),
            fee_wei: check.fee_wei.or(self.fee_wei),
            state,
            submitted_at: self.submitted_at,
            confirmed_at: confirmed_at.or(self.confirmed_at),
            error,
        })
    }
}

fn split_outcome(outcome: &TxOutcome) -> (Option<DateTime<Utc>>, Option<String>) {
    match outcome {
        TxOutcome::Submitted => (None, None),
        TxOutcome::Confirmed { confirmed_at } => (Some(*confirmed_at), None),
        TxOutcome::Failed { error } => (None, Some(error.clone())),
    }
}
