//! Orchestration layer of the FlexSettle settlement engine.
//!
//! This crate provides:
//! - [`Engine`]: the write and read operations over events, proofs,
//!   settlements and claims
//! - Lazy reconciliation of ledger transactions left in `submitted`
//! - The progress summary projection
//! - The structured error model handed to callers
//!
//! Every write follows the same shape: validate against current state,
//! submit to the ledger, then commit one store mutation. A ledger failure
//! leaves the store untouched. A commit failure after a successful submit
//! records the transaction as an orphan.
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use flexsettle_canonical::EventId;
//! use flexsettle_core::{EngineConfig, SimulatedLedger};
//! use flexsettle_engine::{Engine, NewEvent};
//! use flexsettle_store::MemoryStore;
//!
//! let engine = Engine::new(MemoryStore::new(), SimulatedLedger::default(), EngineConfig::default());
//! let start = Utc::now();
//! let event = engine.create_event(NewEvent {
//!     event_id: EventId::parse("evt-1")?,
//!     start_time: start,
//!     end_time: start + Duration::hours(1),
//!     target_kw: 200,
//!     reward_rate: 10,
//!     penalty_rate: 5,
//! })?;
//! println!("{}", event.create_tx.handle);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(missing_docs)]

/// Engine operations.
pub mod engine;
/// Error model.
pub mod errors;
/// Transaction reconciliation.
pub mod reconcile;
/// Progress summary projection.
pub mod summary;

pub use engine::{AuditReport, Engine, NewEvent, ProofSubmission};
pub use errors::{EngineError, ErrorEnvelope, ErrorKind};
pub use reconcile::ReconcileReport;
pub use summary::{ClaimStatus, Health, ProgressSummary, Step, TxPipeline};
