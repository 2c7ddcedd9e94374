//! Progress and audit summary of one event.
//!
//! The projection is a pure function of stored rows; the engine reconciles
//! before calling it.

use chrono::{DateTime, Utc};
use flexsettle_canonical::{EventId, SiteId, TxHandle};
use flexsettle_core::{
    proof_codec, AuditRequest, ConfirmMode, EngineConfig, Event, EventStatus, Proof, Settlement,
    SettlementStatus, TxRecord, TxState,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Workflow milestones in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Event created.
    Create,
    /// All required sites submitted proofs.
    Proofs,
    /// Event closed.
    Close,
    /// Settlement rows computed.
    Settle,
    /// Focus site claimed.
    Claim,
    /// Focus site audited.
    Audit,
    /// Every milestone met.
    Completed,
}

impl Step {
    /// Number of milestones (excluding `Completed`).
    pub const TOTAL: u8 = 6;

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::Proofs => "proofs",
            Step::Close => "close",
            Step::Settle => "settle",
            Step::Claim => "claim",
            Step::Audit => "audit",
            Step::Completed => "completed",
        }
    }
}

/// Coarse status of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Health {
    /// Nothing completed.
    Pending,
    /// Some milestones met.
    InProgress,
    /// All milestones met.
    Done,
}

/// Claim status of the focus site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Not settled yet.
    Pending,
    /// Settled, unclaimed.
    Settled,
    /// Claimed.
    Claimed,
}

/// Ledger transactions of an event, counted per distinct handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TxPipeline {
    /// Distinct handles.
    pub total: usize,
    /// Still awaiting confirmation.
    pub submitted: usize,
    /// Confirmed.
    pub confirmed: usize,
    /// Failed.
    pub failed: usize,
}

/// Read-only projection of an event's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    /// Event.
    pub event_id: EventId,
    /// Event status.
    pub event_status: EventStatus,
    /// Ledger confirmation mode in effect.
    pub confirm_mode: ConfirmMode,
    /// First unmet milestone.
    pub current_step: Step,
    /// Coarse status.
    pub health: Health,
    /// What blocks the current step.
    pub blocking_reason: String,
    /// Suggested next action.
    pub agent_hint: String,
    /// Milestones met.
    pub progress_completed: u8,
    /// Milestone count.
    pub progress_total: u8,
    /// Rounded percentage of milestones met.
    pub progress_pct: u8,
    /// Required sites with a proof.
    pub proof_submitted: usize,
    /// Required site count.
    pub proof_required: usize,
    /// Sum of proof reductions.
    pub total_reduction_kwh: u64,
    /// Sum of settlement payouts.
    pub total_payout: i64,
    /// Site tracked by the claim and audit milestones.
    pub focus_site: SiteId,
    /// Claim status of the focus site.
    pub claim_status: ClaimStatus,
    /// Whether the focus site was audited.
    pub audit_requested: bool,
    /// Whether the focus proof's payload still hashes to its stored hash;
    /// `None` until audited.
    pub audit_match: Option<bool>,
    /// Ledger transaction counts.
    pub tx_pipeline: TxPipeline,
    /// Latest instant at which anything about the event changed.
    pub last_transition_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Close instant.
    pub closed_at: Option<DateTime<Utc>>,
    /// Settlement instant.
    pub settled_at: Option<DateTime<Utc>>,
}

/// Builds the summary. `proofs` and `settlements` belong to `event`;
/// `focus_audit` is the focus site's audit request, if any.
pub fn project(
    event: &Event,
    proofs: &[Proof],
    settlements: &[Settlement],
    focus_audit: Option<&AuditRequest>,
    config: &EngineConfig,
) -> ProgressSummary {
    let focus = config.focus_site();
    let proof_sites: BTreeSet<&SiteId> = proofs.iter().map(|p| &p.site_id).collect();
    let missing: Vec<&SiteId> = config
        .required_sites()
        .iter()
        .filter(|site| !proof_sites.contains(site))
        .collect();

    let proofs_done = missing.is_empty();
    let close_done = matches!(event.status, EventStatus::Closed | EventStatus::Settled);
    let settle_done = !settlements.is_empty();
    let claim_status = match settlements.iter().find(|s| &s.site_id == focus) {
        None => ClaimStatus::Pending,
        Some(row) => match row.status {
            SettlementStatus::Settled => ClaimStatus::Settled,
            SettlementStatus::Claimed => ClaimStatus::Claimed,
        },
    };
    let claim_done = claim_status == ClaimStatus::Claimed;
    let audit_requested = focus_audit.is_some();

    let milestones = [
        (Step::Create, true),
        (Step::Proofs, proofs_done),
        (Step::Close, close_done),
        (Step::Settle, settle_done),
        (Step::Claim, claim_done),
        (Step::Audit, audit_requested),
    ];
    let current_step = milestones
        .iter()
        .find(|(_, done)| !done)
        .map(|(step, _)| *step)
        .unwrap_or(Step::Completed);
    let completed = milestones.iter().filter(|(_, done)| *done).count() as u8;
    let progress_pct =
        ((f64::from(completed) / f64::from(Step::TOTAL)) * 100.0).round() as u8;
    let health = if completed == 0 {
        Health::Pending
    } else if current_step == Step::Completed {
        Health::Done
    } else {
        Health::InProgress
    };

    let audit_match = focus_audit.and_then(|_| {
        proofs
            .iter()
            .find(|p| &p.site_id == focus)
            .map(|p| proof_codec::recompute(&p.payload) == p.proof_hash)
    });

    let (blocking_reason, agent_hint) = guidance(current_step, &missing, focus);

    let total_reduction_kwh = proofs
        .iter()
        .fold(0u64, |acc, p| acc.saturating_add(p.reduction_kwh));
    let total_payout = settlements
        .iter()
        .fold(0i64, |acc, s| acc.saturating_add(s.payout));

    let last_transition_at = [Some(event.created_at), event.closed_at, event.settled_at]
        .into_iter()
        .chain(proofs.iter().map(|p| Some(p.submitted_at)))
        .chain(settlements.iter().map(|s| Some(s.settled_at)))
        .chain(settlements.iter().map(|s| s.claimed_at))
        .chain(std::iter::once(focus_audit.map(|a| a.requested_at)))
        .flatten()
        .max();

    ProgressSummary {
        event_id: event.event_id.clone(),
        event_status: event.status,
        confirm_mode: config.confirm_mode(),
        current_step,
        health,
        blocking_reason,
        agent_hint,
        progress_completed: completed,
        progress_total: Step::TOTAL,
        progress_pct,
        proof_submitted: config.required_sites().len() - missing.len(),
        proof_required: config.required_sites().len(),
        total_reduction_kwh,
        total_payout,
        focus_site: focus.clone(),
        claim_status,
        audit_requested,
        audit_match,
        tx_pipeline: tx_pipeline(event, proofs, settlements),
        last_transition_at,
        created_at: event.created_at,
        closed_at: event.closed_at,
        settled_at: event.settled_at,
    }
}

fn guidance(step: Step, missing: &[&SiteId], focus: &SiteId) -> (String, String) {
    let (reason, hint) = match step {
        Step::Create => (
            "Create event to initialize the workflow.".to_string(),
            "An event is needed before proofs can be collected.",
        ),
        Step::Proofs => {
            let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            (
                format!("Missing proofs: {}.", names.join(", ")),
                "Collect required participant proofs to enable settlement lock.",
            )
        }
        Step::Close => (
            "Proofs ready. Event must be closed before settlement.".to_string(),
            "Close event to lock payout calculation scope.",
        ),
        Step::Settle => (
            "Event closed. Settlement execution pending.".to_string(),
            "Trigger settlement to compute payout records.",
        ),
        Step::Claim => (
            format!("Settlement done. Claim for {} pending.", focus),
            "Complete claim to finalize participant payout.",
        ),
        Step::Audit => (
            "Claim complete. Audit verification pending.".to_string(),
            "Run audit to verify the recorded and recomputed proof hash.",
        ),
        Step::Completed => (
            "No blockers.".to_string(),
            "Closed loop finalized with payout and audit evidence.",
        ),
    };
    (reason, hint.to_string())
}

fn tx_pipeline(event: &Event, proofs: &[Proof], settlements: &[Settlement]) -> TxPipeline {
    let records = std::iter::once(&event.create_tx)
        .chain(event.close_tx.as_ref())
        .chain(proofs.iter().map(|p| &p.submit_tx))
        .chain(settlements.iter().map(|s| &s.settle_tx))
        .chain(settlements.iter().filter_map(|s| s.claim_tx.as_ref()));

    let mut by_handle: BTreeMap<&TxHandle, TxState> = BTreeMap::new();
    for record in records {
        let next = effective_state(record);
        by_handle
            .entry(&record.handle)
            .and_modify(|prev| *prev = merge(*prev, next))
            .or_insert(next);
    }

    let mut pipeline = TxPipeline {
        total: by_handle.len(),
        ..TxPipeline::default()
    };
    for state in by_handle.values() {
        match state {
            TxState::Submitted => pipeline.submitted += 1,
            TxState::Confirmed => pipeline.confirmed += 1,
            TxState::Failed => pipeline.failed += 1,
        }
    }
    pipeline
}

/// A submitted record whose fee is already known counts as confirmed.
fn effective_state(record: &TxRecord) -> TxState {
    if record.state == TxState::Submitted && record.fee_wei.is_some() {
        TxState::Confirmed
    } else {
        record.state
    }
}

fn merge(a: TxState, b: TxState) -> TxState {
    match (a, b) {
        (TxState::Failed, _) | (_, TxState::Failed) => TxState::Failed,
        (TxState::Submitted, _) | (_, TxState::Submitted) => TxState::Submitted,
        _ => TxState::Confirmed,
    }
}
