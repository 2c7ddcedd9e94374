use chrono::{DateTime, Utc};
use flexsettle_canonical::{ActorId, EventId, MethodTag, ProofHash, SiteId};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerAction;
use crate::tx::TxRecord;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Accepting proofs.
    Active,
    /// Proof window locked; awaiting settlement.
    Closed,
    /// Payouts computed.
    Settled,
}

impl EventStatus {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Closed => "closed",
            EventStatus::Settled => "settled",
        }
    }
}

/// Lifecycle status of a settlement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Payout computed, not yet claimed.
    Settled,
    /// Claimed by the proof submitter.
    Claimed,
}

impl SettlementStatus {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SettlementStatus::Settled => "settled",
            SettlementStatus::Claimed => "claimed",
        }
    }
}

/// Load-reduction commitment window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub event_id: EventId,
    /// Window start (UTC).
    pub start_time: DateTime<Utc>,
    /// Window end (UTC), strictly after `start_time`.
    pub end_time: DateTime<Utc>,
    /// Aggregate reduction target in kW.
    pub target_kw: u64,
    /// Reward per kWh of reduction.
    pub reward_rate: u64,
    /// Penalty per kWh of shortfall.
    pub penalty_rate: u64,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Ledger record of the creation.
    pub create_tx: TxRecord,
    /// Ledger record of the close, once closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_tx: Option<TxRecord>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Close instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Settlement instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

/// One site's claimed performance for one event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Owning event.
    pub event_id: EventId,
    /// Reporting site.
    pub site_id: SiteId,
    /// Counterfactual consumption in kWh.
    pub baseline_kwh: u64,
    /// Metered consumption in kWh.
    pub actual_kwh: u64,
    /// `max(baseline - actual, 0)`.
    pub reduction_kwh: u64,
    /// Baseline method tag.
    pub baseline_method: MethodTag,
    /// Pointer to the raw meter data.
    pub uri: String,
    /// Canonical JSON payload the hash was computed over.
    pub payload: String,
    /// Content hash of `payload`.
    pub proof_hash: ProofHash,
    /// Ledger record of the submission.
    pub submit_tx: TxRecord,
    /// Identity that submitted the proof; the only identity allowed to claim.
    pub submitter: ActorId,
    /// Submission instant.
    pub submitted_at: DateTime<Utc>,
}

/// Computed payout for one site within one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Owning event.
    pub event_id: EventId,
    /// Settled site.
    pub site_id: SiteId,
    /// Payout; negative when the shortfall penalty exceeds the reward.
    pub payout: i64,
    /// Lifecycle status.
    pub status: SettlementStatus,
    /// Ledger record of the batch settlement (shared by the whole batch).
    pub settle_tx: TxRecord,
    /// Ledger record of the claim, once claimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_tx: Option<TxRecord>,
    /// Settlement instant.
    pub settled_at: DateTime<Utc>,
    /// Claim instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Record that an auditor asked to re-verify a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    /// Audited event.
    pub event_id: EventId,
    /// Audited site.
    pub site_id: SiteId,
    /// Latest request instant.
    pub requested_at: DateTime<Utc>,
}

/// Ledger action that succeeded externally but has no local commit.
///
/// Kept for manual reconciliation; never resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanTx {
    /// Action that was submitted.
    pub action: LedgerAction,
    /// Event the action belonged to.
    pub event_id: EventId,
    /// Site, for per-site actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<SiteId>,
    /// Ledger record returned by the submit.
    pub tx: TxRecord,
    /// Why the local commit did not happen.
    pub reason: String,
    /// Instant the orphan was recorded.
    pub recorded_at: DateTime<Utc>,
}
