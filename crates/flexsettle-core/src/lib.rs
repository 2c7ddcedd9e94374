//! Core domain types for the FlexSettle demand-response settlement engine.
//!
//! This crate provides:
//! - Entity records (events, proofs, settlements, audit requests) and the
//!   embedded transaction-lifecycle sub-record
//! - The proof codec: canonical payload construction and content hashing
//! - The payout scorer
//! - The ledger adapter contract plus a simulated ledger
//! - Engine configuration
//!
//! Core invariants:
//! - Proof hashes are content-derived: `sha256(canonical_bytes(payload))`
//! - Reduction is never negative
//! - Transaction records only move `submitted -> confirmed | failed`
//!
#![deny(missing_docs)]

/// Engine configuration.
pub mod config;
/// Error types for core operations.
pub mod errors;
/// Ledger adapter contract and the simulated ledger.
pub mod ledger;
/// Entity records.
pub mod model;
/// Proof canonicalization and hashing.
pub mod proof_codec;
/// Payout scoring.
pub mod scorer;
/// Transaction-lifecycle sub-record and ledger results.
pub mod tx;

pub use config::{ConfirmMode, EngineConfig};
pub use errors::{CodecError, CoreError};
pub use ledger::{LedgerAction, LedgerAdapter, LedgerError, SimulatedLedger};
pub use model::{AuditRequest, Event, EventStatus, OrphanTx, Proof, Settlement, SettlementStatus};
pub use proof_codec::{CanonicalProof, ProofInput};
pub use tx::{TxCheck, TxOutcome, TxRecord, TxResult, TxState};

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC instant truncated to whole seconds, the resolution every
/// persisted timestamp uses.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
