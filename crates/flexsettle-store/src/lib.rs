//! Ledger-index store for FlexSettle.
//!
//! This crate provides:
//! - The [`LedgerIndexStore`] trait: one atomic write path
//!   ([`LedgerIndexStore::commit`]) plus keyed reads
//! - [`Mutation`], the unit of atomicity and durability
//! - [`MemoryStore`] for tests and embedders
//! - [`JournalStore`], which persists each commit as one frame in a
//!   `flexsettle-journal` file and replays it on open
//!
//! A commit validates the mutation against current state under the store
//! lock, makes it durable, then applies it. Duplicate keys and failed status
//! compare-and-set surface as [`Conflict`]s, so concurrent writers racing for
//! the same transition get exactly one winner.

#![deny(missing_docs)]

/// Error types for store operations.
pub mod error;
/// Journal-backed storage implementation.
pub mod journal;
/// In-memory storage implementation.
pub mod memory;
/// Atomic mutations and transaction references.
pub mod mutation;
/// Table state shared by the backends.
pub mod tables;
/// Storage backend trait.
pub mod traits;

pub use error::{Conflict, StoreError};
pub use flexsettle_journal::WriteOptions;
pub use journal::{CommitRecord, JournalStore};
pub use memory::MemoryStore;
pub use mutation::{Mutation, PendingTx, TxRef, TxScope, TxSlot, TxUpdate};
pub use tables::Tables;
pub use traits::LedgerIndexStore;
