//! In-memory store.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{AuditRequest, Event, OrphanTx, Proof, Settlement};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::mutation::{Mutation, PendingTx, TxScope};
use crate::tables::Tables;
use crate::traits::LedgerIndexStore;

/// Non-durable store. State lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerIndexStore for MemoryStore {
    fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables.check(&mutation)?;
        tables.apply(mutation);
        Ok(())
    }

    fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.tables()?.event(event_id).cloned())
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.tables()?.events().cloned().collect())
    }

    fn get_proof(&self, event_id: &EventId, site_id: &SiteId) -> Result<Option<Proof>, StoreError> {
        Ok(self.tables()?.proof(event_id, site_id).cloned())
    }

    fn list_proofs(&self, event_id: &EventId) -> Result<Vec<Proof>, StoreError> {
        Ok(self.tables()?.proofs_for(event_id).cloned().collect())
    }

    fn get_settlement(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<Settlement>, StoreError> {
        Ok(self.tables()?.settlement(event_id, site_id).cloned())
    }

    fn list_settlements(&self, event_id: &EventId) -> Result<Vec<Settlement>, StoreError> {
        Ok(self.tables()?.settlements_for(event_id).cloned().collect())
    }

    fn get_audit(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<AuditRequest>, StoreError> {
        Ok(self.tables()?.audit(event_id, site_id).cloned())
    }

    fn pending_transactions(&self, scope: &TxScope) -> Result<Vec<PendingTx>, StoreError> {
        Ok(self.tables()?.pending(scope))
    }

    fn list_orphans(&self) -> Result<Vec<OrphanTx>, StoreError> {
        Ok(self.tables()?.orphans().to_vec())
    }
}
