//! Storage backend trait.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{AuditRequest, Event, OrphanTx, Proof, Settlement};

use crate::error::StoreError;
use crate::mutation::{Mutation, PendingTx, TxScope};

/// Durable index of events, proofs, settlements and their ledger
/// transactions.
///
/// `commit` is the only write path. It validates the mutation against
/// current state, makes it durable, then applies it, atomically with respect
/// to every other call on the same store.
pub trait LedgerIndexStore: Send + Sync {
    /// Validates, persists and applies one mutation.
    fn commit(&self, mutation: Mutation) -> Result<(), StoreError>;

    /// Largest serialized mutation `commit` can persist, or `None` when
    /// unbounded. Callers use it to reject oversized writes before they have
    /// side effects elsewhere.
    fn max_commit_bytes(&self) -> Option<usize> {
        None
    }

    /// Event by id.
    fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError>;

    /// All events in id order.
    fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Proof by key.
    fn get_proof(&self, event_id: &EventId, site_id: &SiteId)
        -> Result<Option<Proof>, StoreError>;

    /// Proofs of an event in site order.
    fn list_proofs(&self, event_id: &EventId) -> Result<Vec<Proof>, StoreError>;

    /// Settlement by key.
    fn get_settlement(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<Settlement>, StoreError>;

    /// Settlements of an event in site order.
    fn list_settlements(&self, event_id: &EventId) -> Result<Vec<Settlement>, StoreError>;

    /// Audit request by key.
    fn get_audit(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<AuditRequest>, StoreError>;

    /// Sub-records in `scope` that are `submitted` with no fee yet.
    fn pending_transactions(&self, scope: &TxScope) -> Result<Vec<PendingTx>, StoreError>;

    /// Orphaned ledger actions in record order.
    fn list_orphans(&self) -> Result<Vec<OrphanTx>, StoreError>;
}
