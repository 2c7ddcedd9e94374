use chrono::{DateTime, Utc};
use flexsettle_canonical::{ActorId, EventId, ProofHash, SiteId, TxHandle};
use flexsettle_core::{CodecError, EventStatus, LedgerAction, LedgerError, SettlementStatus};
use flexsettle_store::StoreError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-order request.
    Validation,
    /// Lost a uniqueness or state compare-and-set.
    Conflict,
    /// Referenced entity does not exist.
    NotFound,
    /// Caller is not allowed to perform the action.
    Forbidden,
    /// Declared content hash does not match the content.
    Integrity,
    /// The ledger failed or answered nonsense.
    ExternalFailure,
    /// Local persistence failed.
    StorageFailure,
}

impl ErrorKind {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Integrity => "integrity",
            ErrorKind::ExternalFailure => "external_failure",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// `start_time` is not strictly before `end_time`.
    #[error("event window is empty: start {start} is not before end {end}")]
    InvalidTimeWindow {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },
    /// Settlement resolved to zero sites.
    #[error("no sites to settle for event {event_id}")]
    EmptySiteIds {
        /// Event being settled.
        event_id: EventId,
    },
    /// The proof payload could not be canonicalized.
    #[error("invalid proof payload: {0}")]
    InvalidProofPayload(#[from] CodecError),
    /// The proof would not fit in one store commit.
    #[error("proof record of {size} bytes exceeds the store limit of {max} bytes")]
    ProofTooLarge {
        /// Estimated serialized size of the proof record.
        size: usize,
        /// Largest commit the store accepts.
        max: usize,
    },
    /// Proofs are only accepted while the event is active.
    #[error("event {event_id} is {}, proofs require an active event", status.as_str())]
    EventNotActive {
        /// Event.
        event_id: EventId,
        /// Current status.
        status: EventStatus,
    },
    /// Settlement requires a closed event.
    #[error("event {event_id} must be closed before settlement")]
    EventNotClosed {
        /// Event.
        event_id: EventId,
    },
    /// A site named for settlement has no proof.
    #[error("proof missing for site {site_id} of event {event_id}")]
    ProofMissing {
        /// Event.
        event_id: EventId,
        /// Site without a proof.
        site_id: SiteId,
    },
    /// The event id is taken.
    #[error("event {event_id} already exists")]
    EventExists {
        /// Event.
        event_id: EventId,
    },
    /// The event was already closed.
    #[error("event {event_id} already closed")]
    EventAlreadyClosed {
        /// Event.
        event_id: EventId,
    },
    /// The event was already settled.
    #[error("event {event_id} already settled")]
    EventAlreadySettled {
        /// Event.
        event_id: EventId,
    },
    /// A proof for this site was already submitted.
    #[error("proof already submitted for {event_id}/{site_id}")]
    ProofExists {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
    },
    /// The site already has a settlement row.
    #[error("settlement already exists for {event_id}/{site_id}")]
    AlreadySettled {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
    },
    /// The settlement is not in `settled` state.
    #[error("settlement for {event_id}/{site_id} is {}, not claimable", status.as_str())]
    NotClaimable {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
        /// Current status.
        status: SettlementStatus,
    },
    /// No such event.
    #[error("event {event_id} not found")]
    EventNotFound {
        /// Event.
        event_id: EventId,
    },
    /// No proof for this key.
    #[error("proof not found for {event_id}/{site_id}")]
    ProofNotFound {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
    },
    /// No settlement for this key.
    #[error("settlement not found for {event_id}/{site_id}")]
    SettlementNotFound {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
    },
    /// Only the proof submitter may claim.
    #[error("{claimant} is not the proof submitter for {event_id}/{site_id}")]
    NotProofSubmitter {
        /// Event.
        event_id: EventId,
        /// Site.
        site_id: SiteId,
        /// Rejected caller.
        claimant: ActorId,
    },
    /// The caller's declared hash does not match the canonical payload.
    #[error("declared proof hash {declared} does not match computed {computed}")]
    ProofHashMismatch {
        /// Hash supplied by the caller.
        declared: String,
        /// Hash of the canonical payload.
        computed: ProofHash,
    },
    /// The ledger call failed; nothing was persisted.
    #[error("ledger {action} failed: {source}")]
    Ledger {
        /// Action being submitted or checked.
        action: LedgerAction,
        /// Adapter error.
        #[source]
        source: LedgerError,
    },
    /// Re-querying a submitted transaction failed. Records that did advance
    /// in the same pass were committed; this one stays `submitted`.
    #[error("ledger check of {handle} failed ({failed} of {checks} checks): {source}")]
    LedgerCheck {
        /// First handle whose check failed.
        handle: TxHandle,
        /// Failed checks in the pass.
        failed: usize,
        /// Checks made in the pass.
        checks: usize,
        /// Adapter error of the first failure.
        #[source]
        source: LedgerError,
    },
    /// Local persistence failed.
    #[error("storage failure: {source}")]
    Storage {
        /// Store error.
        #[source]
        source: StoreError,
        /// Ledger transaction that went through without a local commit.
        orphan_tx: Option<TxHandle>,
    },
}

impl From<StoreError> for EngineError {
    fn from(source: StoreError) -> Self {
        EngineError::Storage {
            source,
            orphan_tx: None,
        }
    }
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidTimeWindow { .. } => "INVALID_TIME_WINDOW",
            EngineError::EmptySiteIds { .. } => "EMPTY_SITE_IDS",
            EngineError::InvalidProofPayload(_) | EngineError::ProofTooLarge { .. } => {
                "INVALID_PROOF_PAYLOAD"
            }
            EngineError::EventNotActive { .. } => "EVENT_NOT_ACTIVE",
            EngineError::EventNotClosed { .. } => "EVENT_NOT_CLOSED",
            EngineError::ProofMissing { .. } => "PROOF_MISSING",
            EngineError::EventExists { .. } => "EVENT_EXISTS",
            EngineError::EventAlreadyClosed { .. } => "EVENT_ALREADY_CLOSED",
            EngineError::EventAlreadySettled { .. } => "EVENT_ALREADY_SETTLED",
            EngineError::ProofExists { .. } => "PROOF_EXISTS",
            EngineError::AlreadySettled { .. } => "ALREADY_SETTLED",
            EngineError::NotClaimable { .. } => "NOT_CLAIMABLE",
            EngineError::EventNotFound { .. } => "EVENT_NOT_FOUND",
            EngineError::ProofNotFound { .. } => "PROOF_NOT_FOUND",
            EngineError::SettlementNotFound { .. } => "SETTLEMENT_NOT_FOUND",
            EngineError::NotProofSubmitter { .. } => "NOT_PROOF_SUBMITTER",
            EngineError::ProofHashMismatch { .. } => "PROOF_HASH_MISMATCH",
            EngineError::Ledger {
                source: LedgerError::Malformed(_),
                ..
            } => "CHAIN_TX_INVALID_RESPONSE",
            EngineError::LedgerCheck {
                source: LedgerError::Malformed(_),
                ..
            } => "CHAIN_TX_INVALID_RESPONSE",
            EngineError::Ledger { .. } | EngineError::LedgerCheck { .. } => "CHAIN_TX_FAILED",
            EngineError::Storage { .. } => "STORAGE_FAILURE",
        }
    }

    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidTimeWindow { .. }
            | EngineError::EmptySiteIds { .. }
            | EngineError::InvalidProofPayload(_)
            | EngineError::ProofTooLarge { .. }
            | EngineError::EventNotActive { .. }
            | EngineError::EventNotClosed { .. }
            | EngineError::ProofMissing { .. } => ErrorKind::Validation,
            EngineError::EventExists { .. }
            | EngineError::EventAlreadyClosed { .. }
            | EngineError::EventAlreadySettled { .. }
            | EngineError::ProofExists { .. }
            | EngineError::AlreadySettled { .. }
            | EngineError::NotClaimable { .. } => ErrorKind::Conflict,
            EngineError::EventNotFound { .. }
            | EngineError::ProofNotFound { .. }
            | EngineError::SettlementNotFound { .. } => ErrorKind::NotFound,
            EngineError::NotProofSubmitter { .. } => ErrorKind::Forbidden,
            EngineError::ProofHashMismatch { .. } => ErrorKind::Integrity,
            EngineError::Ledger { .. } | EngineError::LedgerCheck { .. } => {
                ErrorKind::ExternalFailure
            }
            EngineError::Storage { .. } => ErrorKind::StorageFailure,
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    pub fn retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ExternalFailure | ErrorKind::StorageFailure
        )
    }

    /// Structured context for the error envelope.
    pub fn details(&self) -> Value {
        let mut details = Map::new();
        let mut put = |key: &str, value: Value| {
            details.insert(key.to_string(), value);
        };
        match self {
            EngineError::InvalidTimeWindow { start, end } => {
                put("start_time", json!(start));
                put("end_time", json!(end));
            }
            EngineError::InvalidProofPayload(_) => {}
            EngineError::ProofTooLarge { size, max } => {
                put("size", json!(size));
                put("max", json!(max));
            }
            EngineError::EmptySiteIds { event_id }
            | EngineError::EventNotClosed { event_id }
            | EngineError::EventExists { event_id }
            | EngineError::EventAlreadyClosed { event_id }
            | EngineError::EventAlreadySettled { event_id }
            | EngineError::EventNotFound { event_id } => put("event_id", json!(event_id)),
            EngineError::EventNotActive { event_id, status } => {
                put("event_id", json!(event_id));
                put("status", json!(status));
            }
            EngineError::ProofMissing { event_id, site_id }
            | EngineError::ProofExists { event_id, site_id }
            | EngineError::AlreadySettled { event_id, site_id }
            | EngineError::ProofNotFound { event_id, site_id }
            | EngineError::SettlementNotFound { event_id, site_id } => {
                put("event_id", json!(event_id));
                put("site_id", json!(site_id));
            }
            EngineError::NotClaimable {
                event_id,
                site_id,
                status,
            } => {
                put("event_id", json!(event_id));
                put("site_id", json!(site_id));
                put("status", json!(status));
            }
            EngineError::NotProofSubmitter {
                event_id,
                site_id,
                claimant,
            } => {
                put("event_id", json!(event_id));
                put("site_id", json!(site_id));
                put("actor_id", json!(claimant));
            }
            EngineError::ProofHashMismatch { declared, computed } => {
                put("declared", json!(declared));
                put("computed", json!(computed));
            }
            EngineError::Ledger { action, .. } => put("action", json!(action)),
            EngineError::LedgerCheck {
                handle,
                failed,
                checks,
                ..
            } => {
                put("handle", json!(handle));
                put("failed_checks", json!(failed));
                put("checks", json!(checks));
            }
            EngineError::Storage { orphan_tx, .. } => {
                if let Some(handle) = orphan_tx {
                    put("orphan_tx", json!(handle));
                }
            }
        }
        Value::Object(details)
    }

    /// Serializable form handed across the operation boundary.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code(),
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.retryable(),
            details: self.details(),
        }
    }
}

/// Stable error shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    /// Machine-readable code, e.g. `PROOF_EXISTS`.
    pub code: &'static str,
    /// Category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Whether retrying unchanged may succeed.
    pub retryable: bool,
    /// Structured context (ids, offending values).
    pub details: Value,
}

impl From<&EngineError> for ErrorEnvelope {
    fn from(err: &EngineError) -> Self {
        err.envelope()
    }
}
