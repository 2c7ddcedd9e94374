//! Error types for store operations.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{EventStatus, SettlementStatus};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The mutation conflicts with current state; nothing was written.
    #[error("conflict: {0}")]
    Conflict(#[from] Conflict),
    /// A row the mutation depends on does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind (`event`, `proof`, `settlement`).
        entity: &'static str,
        /// Key of the missing row.
        key: String,
    },
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Journal backend error.
    #[error("journal error: {0}")]
    Journal(#[from] flexsettle_journal::JournalError),
    /// A replayed journal does not describe a consistent history.
    #[error("journal replay failed at commit {seq}: {reason}")]
    Replay {
        /// Sequence number of the offending commit.
        seq: u64,
        /// What went wrong.
        reason: String,
    },
    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// State conflicts detected while validating a mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// An event with this id already exists.
    #[error("event {event_id} already exists")]
    EventExists {
        /// Conflicting event.
        event_id: EventId,
    },
    /// A proof for this key already exists.
    #[error("proof for {event_id}/{site_id} already exists")]
    ProofExists {
        /// Event of the proof.
        event_id: EventId,
        /// Site of the proof.
        site_id: SiteId,
    },
    /// A settlement for this key already exists.
    #[error("settlement for {event_id}/{site_id} already exists")]
    SettlementExists {
        /// Event of the settlement.
        event_id: EventId,
        /// Site of the settlement.
        site_id: SiteId,
    },
    /// Event status compare-and-set failed.
    #[error("event {event_id} is {}, expected {}", found.as_str(), expected.as_str())]
    EventStatus {
        /// Event whose status did not match.
        event_id: EventId,
        /// Status the mutation requires.
        expected: EventStatus,
        /// Status actually stored.
        found: EventStatus,
    },
    /// Settlement status compare-and-set failed.
    #[error("settlement for {event_id}/{site_id} is {}", found.as_str())]
    SettlementStatus {
        /// Event of the settlement.
        event_id: EventId,
        /// Site of the settlement.
        site_id: SiteId,
        /// Status actually stored.
        found: SettlementStatus,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
