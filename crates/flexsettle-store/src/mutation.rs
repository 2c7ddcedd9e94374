//! Atomic store mutations.

use chrono::{DateTime, Utc};
use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{AuditRequest, Event, OrphanTx, Proof, Settlement, TxRecord};
use serde::{Deserialize, Serialize};

/// One atomic change to the ledger index. Either all of it is applied and
/// made durable, or none of it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Insert a new event; fails if the id exists.
    InsertEvent {
        /// Event row.
        event: Event,
    },
    /// Flip an event `active -> closed`.
    CloseEvent {
        /// Event to close.
        event_id: EventId,
        /// Ledger record of the close.
        close_tx: TxRecord,
        /// Close instant.
        closed_at: DateTime<Utc>,
    },
    /// Insert a proof for an active event; fails on duplicates.
    InsertProof {
        /// Proof row.
        proof: Proof,
    },
    /// Insert every settlement row of a batch and flip the event
    /// `closed -> settled`.
    SettleEvent {
        /// Settled event.
        event_id: EventId,
        /// One row per settled site.
        settlements: Vec<Settlement>,
        /// Settlement instant.
        settled_at: DateTime<Utc>,
    },
    /// Flip a settlement `settled -> claimed`.
    ClaimSettlement {
        /// Event of the settlement.
        event_id: EventId,
        /// Site of the settlement.
        site_id: SiteId,
        /// Ledger record of the claim.
        claim_tx: TxRecord,
        /// Claim instant.
        claimed_at: DateTime<Utc>,
    },
    /// Record an audit request, replacing the previous instant.
    UpsertAudit {
        /// Audit request row.
        request: AuditRequest,
    },
    /// Advance transaction records found by one reconciliation pass.
    ApplyTxUpdates {
        /// Advanced records.
        updates: Vec<TxUpdate>,
    },
    /// Remember a ledger action with no local commit.
    RecordOrphan {
        /// Orphan record.
        orphan: OrphanTx,
    },
}

impl Mutation {
    /// Short operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Mutation::InsertEvent { .. } => "insert_event",
            Mutation::CloseEvent { .. } => "close_event",
            Mutation::InsertProof { .. } => "insert_proof",
            Mutation::SettleEvent { .. } => "settle_event",
            Mutation::ClaimSettlement { .. } => "claim_settlement",
            Mutation::UpsertAudit { .. } => "upsert_audit",
            Mutation::ApplyTxUpdates { .. } => "apply_tx_updates",
            Mutation::RecordOrphan { .. } => "record_orphan",
        }
    }
}

/// Which transaction sub-record of an event scope a [`TxRef`] points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxSlot {
    /// `Event::create_tx`.
    EventCreate,
    /// `Event::close_tx`.
    EventClose,
    /// `Proof::submit_tx` of a site.
    ProofSubmit(SiteId),
    /// `Settlement::settle_tx` of a site.
    Settle(SiteId),
    /// `Settlement::claim_tx` of a site.
    Claim(SiteId),
}

/// Location of one transaction sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    /// Owning event.
    pub event_id: EventId,
    /// Sub-record within the event scope.
    pub slot: TxSlot,
}

/// Advanced record for one sub-record.
///
/// Only applied when the stored record is still `submitted` and carries the
/// same handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxUpdate {
    /// Target sub-record.
    pub target: TxRef,
    /// Replacement record.
    pub record: TxRecord,
}

/// Sub-record awaiting reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    /// Where it lives.
    pub target: TxRef,
    /// Current stored record.
    pub record: TxRecord,
}

/// Which event scopes a pending-transaction scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxScope {
    /// Every event.
    All,
    /// One event.
    Event(EventId),
}

impl TxScope {
    /// Whether `event_id` falls in this scope.
    pub fn contains(&self, event_id: &EventId) -> bool {
        match self {
            TxScope::All => true,
            TxScope::Event(id) => id == event_id,
        }
    }
}
