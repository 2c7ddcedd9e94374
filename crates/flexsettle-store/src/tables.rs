//! In-memory tables shared by every store backend.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{
    AuditRequest, Event, EventStatus, OrphanTx, Proof, Settlement, SettlementStatus, TxRecord,
    TxState,
};
use std::collections::BTreeMap;

use crate::error::{Conflict, StoreError};
use crate::mutation::{Mutation, PendingTx, TxRef, TxScope, TxSlot, TxUpdate};

type SiteKey = (EventId, SiteId);

/// Current state of the ledger index.
///
/// Backends validate a mutation with [`Tables::check`], make it durable, then
/// apply it with [`Tables::apply`], all under one lock.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    events: BTreeMap<EventId, Event>,
    proofs: BTreeMap<SiteKey, Proof>,
    settlements: BTreeMap<SiteKey, Settlement>,
    audits: BTreeMap<SiteKey, AuditRequest>,
    orphans: Vec<OrphanTx>,
}

fn key(event_id: &EventId, site_id: &SiteId) -> SiteKey {
    (event_id.clone(), site_id.clone())
}

fn scope_of<'a, V>(
    map: &'a BTreeMap<SiteKey, V>,
    event_id: &'a EventId,
) -> impl Iterator<Item = &'a V> + 'a {
    map.range(key(event_id, &SiteId::new(String::new()))..)
        .take_while(move |((e, _), _)| e == event_id)
        .map(|(_, v)| v)
}

impl Tables {
    /// Validates `mutation` against current state without changing anything.
    pub fn check(&self, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::InsertEvent { event } => {
                if self.events.contains_key(&event.event_id) {
                    return Err(Conflict::EventExists {
                        event_id: event.event_id.clone(),
                    }
                    .into());
                }
            }
            Mutation::CloseEvent { event_id, .. } => {
                self.expect_event_status(event_id, EventStatus::Active)?;
            }
            Mutation::InsertProof { proof } => {
                self.expect_event_status(&proof.event_id, EventStatus::Active)?;
                if self.proofs.contains_key(&key(&proof.event_id, &proof.site_id)) {
                    return Err(Conflict::ProofExists {
                        event_id: proof.event_id.clone(),
                        site_id: proof.site_id.clone(),
                    }
                    .into());
                }
            }
            Mutation::SettleEvent {
                event_id,
                settlements,
                ..
            } => {
                self.expect_event_status(event_id, EventStatus::Closed)?;
                for row in settlements {
                    let k = key(event_id, &row.site_id);
                    if !self.proofs.contains_key(&k) {
                        return Err(StoreError::not_found(
                            "proof",
                            format!("{}/{}", event_id, row.site_id),
                        ));
                    }
                    if self.settlements.contains_key(&k) {
                        return Err(Conflict::SettlementExists {
                            event_id: event_id.clone(),
                            site_id: row.site_id.clone(),
                        }
                        .into());
                    }
                }
            }
            Mutation::ClaimSettlement {
                event_id, site_id, ..
            } => {
                let row = self.settlements.get(&key(event_id, site_id)).ok_or_else(|| {
                    StoreError::not_found("settlement", format!("{}/{}", event_id, site_id))
                })?;
                if row.status != SettlementStatus::Settled {
                    return Err(Conflict::SettlementStatus {
                        event_id: event_id.clone(),
                        site_id: site_id.clone(),
                        found: row.status,
                    }
                    .into());
                }
            }
            Mutation::UpsertAudit { request } => {
                if !self
                    .proofs
                    .contains_key(&key(&request.event_id, &request.site_id))
                {
                    return Err(StoreError::not_found(
                        "proof",
                        format!("{}/{}", request.event_id, request.site_id),
                    ));
                }
            }
            Mutation::ApplyTxUpdates { .. } | Mutation::RecordOrphan { .. } => {}
        }
        Ok(())
    }

    fn expect_event_status(
        &self,
        event_id: &EventId,
        expected: EventStatus,
    ) -> Result<(), StoreError> {
        let event = self
            .events
            .get(event_id)
            .ok_or_else(|| StoreError::not_found("event", event_id))?;
        if event.status != expected {
            return Err(Conflict::EventStatus {
                event_id: event_id.clone(),
                expected,
                found: event.status,
            }
            .into());
        }
        Ok(())
    }

    /// Applies a mutation that already passed [`Tables::check`].
    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::InsertEvent { event } => {
                self.events.insert(event.event_id.clone(), event);
            }
            Mutation::CloseEvent {
                event_id,
                close_tx,
                closed_at,
            } => {
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.status = EventStatus::Closed;
                    event.close_tx = Some(close_tx);
                    event.closed_at = Some(closed_at);
                }
            }
            Mutation::InsertProof { proof } => {
                self.proofs
                    .insert(key(&proof.event_id, &proof.site_id), proof);
            }
            Mutation::SettleEvent {
                event_id,
                settlements,
                settled_at,
            } => {
                for row in settlements {
                    self.settlements.insert(key(&event_id, &row.site_id), row);
                }
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.status = EventStatus::Settled;
                    event.settled_at = Some(settled_at);
                }
            }
            Mutation::ClaimSettlement {
                event_id,
                site_id,
                claim_tx,
                claimed_at,
            } => {
                if let Some(row) = self.settlements.get_mut(&key(&event_id, &site_id)) {
                    row.status = SettlementStatus::Claimed;
                    row.claim_tx = Some(claim_tx);
                    row.claimed_at = Some(claimed_at);
                }
            }
            Mutation::UpsertAudit { request } => {
                self.audits
                    .insert(key(&request.event_id, &request.site_id), request);
            }
            Mutation::ApplyTxUpdates { updates } => {
                for update in updates {
                    self.apply_tx_update(update);
                }
            }
            Mutation::RecordOrphan { orphan } => self.orphans.push(orphan),
        }
    }

    fn apply_tx_update(&mut self, update: TxUpdate) {
        let TxUpdate { target, record } = update;
        if let Some(slot) = self.tx_slot_mut(&target) {
            if slot.state == TxState::Submitted && slot.handle == record.handle {
                *slot = record;
            }
        }
    }

    fn tx_slot_mut(&mut self, target: &TxRef) -> Option<&mut TxRecord> {
        let event_id = &target.event_id;
        match &target.slot {
            TxSlot::EventCreate => self.events.get_mut(event_id).map(|e| &mut e.create_tx),
            TxSlot::EventClose => self
                .events
                .get_mut(event_id)
                .and_then(|e| e.close_tx.as_mut()),
            TxSlot::ProofSubmit(site) => self
                .proofs
                .get_mut(&key(event_id, site))
                .map(|p| &mut p.submit_tx),
            TxSlot::Settle(site) => self
                .settlements
                .get_mut(&key(event_id, site))
                .map(|s| &mut s.settle_tx),
            TxSlot::Claim(site) => self
                .settlements
                .get_mut(&key(event_id, site))
                .and_then(|s| s.claim_tx.as_mut()),
        }
    }

    /// Event by id.
    pub fn event(&self, event_id: &EventId) -> Option<&Event> {
        self.events.get(event_id)
    }

    /// All events in id order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Proof by key.
    pub fn proof(&self, event_id: &EventId, site_id: &SiteId) -> Option<&Proof> {
        self.proofs.get(&key(event_id, site_id))
    }

    /// Proofs of an event in site order.
    pub fn proofs_for<'a>(&'a self, event_id: &'a EventId) -> impl Iterator<Item = &'a Proof> + 'a {
        scope_of(&self.proofs, event_id)
    }

    /// Settlement by key.
    pub fn settlement(&self, event_id: &EventId, site_id: &SiteId) -> Option<&Settlement> {
        self.settlements.get(&key(event_id, site_id))
    }

    /// Settlements of an event in site order.
    pub fn settlements_for<'a>(
        &'a self,
        event_id: &'a EventId,
    ) -> impl Iterator<Item = &'a Settlement> + 'a {
        scope_of(&self.settlements, event_id)
    }

    /// Audit request by key.
    pub fn audit(&self, event_id: &EventId, site_id: &SiteId) -> Option<&AuditRequest> {
        self.audits.get(&key(event_id, site_id))
    }

    /// Orphaned ledger actions in record order.
    pub fn orphans(&self) -> &[OrphanTx] {
        &self.orphans
    }

    /// Every sub-record in `scope` that still needs reconciliation.
    pub fn pending(&self, scope: &TxScope) -> Vec<PendingTx> {
        let mut pending = Vec::new();
        let mut push = |event_id: &EventId, slot: TxSlot, record: &TxRecord| {
            if record.needs_reconcile() {
                pending.push(PendingTx {
                    target: TxRef {
                        event_id: event_id.clone(),
                        slot,
                    },
                    record: record.clone(),
                });
            }
        };

        for event in self.events.values().filter(|e| scope.contains(&e.event_id)) {
            push(&event.event_id, TxSlot::EventCreate, &event.create_tx);
            if let Some(tx) = &event.close_tx {
                push(&event.event_id, TxSlot::EventClose, tx);
            }
        }
        for proof in self.proofs.values().filter(|p| scope.contains(&p.event_id)) {
            push(
                &proof.event_id,
                TxSlot::ProofSubmit(proof.site_id.clone()),
                &proof.submit_tx,
            );
        }
        for row in self
            .settlements
            .values()
            .filter(|s| scope.contains(&s.event_id))
        {
            push(&row.event_id, TxSlot::Settle(row.site_id.clone()), &row.settle_tx);
            if let Some(tx) = &row.claim_tx {
                push(&row.event_id, TxSlot::Claim(row.site_id.clone()), tx);
            }
        }
        pending
    }
}
