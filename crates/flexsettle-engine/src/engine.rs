use chrono::{DateTime, Utc};
use flexsettle_canonical::{ActorId, Canonicalizer, EventId, MethodTag, ProofHash, SiteId};
use flexsettle_core::{
    now_utc, proof_codec, scorer, AuditRequest, EngineConfig, Event, EventStatus, LedgerAction,
    LedgerAdapter, OrphanTx, Proof, ProofInput, Settlement, SettlementStatus, TxRecord,
};
use flexsettle_store::{Conflict, LedgerIndexStore, Mutation, StoreError, TxScope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::EngineError;
use crate::reconcile::{self, ReconcileReport};
use crate::summary::{self, ProgressSummary};

/// Serialized bytes reserved in a proof commit for everything except the
/// canonical payload and the uri: ids, quantities, timestamps and the ledger
/// sub-record.
const PROOF_RECORD_HEADROOM: usize = 16 * 1024;

/// Request to create an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Operator-chosen id.
    pub event_id: EventId,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end; must be after `start_time`.
    pub end_time: DateTime<Utc>,
    /// Aggregate reduction target in kW.
    pub target_kw: u64,
    /// Reward per kWh.
    pub reward_rate: u64,
    /// Penalty per kWh of shortfall.
    pub penalty_rate: u64,
}

/// Request to submit a site's proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSubmission {
    /// Event.
    pub event_id: EventId,
    /// Reporting site.
    pub site_id: SiteId,
    /// Counterfactual consumption in kWh.
    pub baseline_kwh: u64,
    /// Metered consumption in kWh.
    pub actual_kwh: u64,
    /// Baseline method tag.
    pub baseline_method: MethodTag,
    /// Pointer to the raw meter data.
    pub uri: String,
    /// Raw evidence; must be a JSON object when present.
    #[serde(default)]
    pub raw_payload: Option<Value>,
    /// Hash the caller computed, verified and then discarded.
    #[serde(default)]
    pub proof_hash: Option<String>,
    /// Authenticated submitter.
    pub submitter: ActorId,
}

/// Result of re-verifying a stored proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Event.
    pub event_id: EventId,
    /// Site.
    pub site_id: SiteId,
    /// Hash recorded at submission.
    pub stored_hash: ProofHash,
    /// Hash recomputed from the stored payload.
    pub recomputed_hash: ProofHash,
    /// Whether the two agree.
    pub matches: bool,
    /// Pointer to the raw meter data.
    pub raw_uri: String,
    /// Instant of this audit request.
    pub requested_at: DateTime<Utc>,
}

/// Orchestrates events, proofs, settlements and claims.
///
/// Every write validates first, then calls the ledger, then commits exactly
/// one store mutation. Reads reconcile pending ledger transactions of the
/// event they touch before loading; a failed check fails the read with
/// `CHAIN_TX_FAILED` after the answered checks are committed.
pub struct Engine<S, L> {
    store: S,
    ledger: L,
    config: EngineConfig,
    canonicalizer: Canonicalizer,
}

impl<S: LedgerIndexStore, L: LedgerAdapter> Engine<S, L> {
    /// Builds an engine over a store and a ledger adapter.
    pub fn new(store: S, ledger: L, config: EngineConfig) -> Self {
        Self {
            store,
            ledger,
            config,
            canonicalizer: Canonicalizer::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an event and mirrors it on the ledger.
    pub fn create_event(&self, request: NewEvent) -> Result<Event, EngineError> {
        if request.start_time >= request.end_time {
            return Err(EngineError::InvalidTimeWindow {
                start: request.start_time,
                end: request.end_time,
            });
        }
        if self.store.get_event(&request.event_id)?.is_some() {
            return Err(EngineError::EventExists {
                event_id: request.event_id,
            });
        }

        let action = LedgerAction::CreateEvent;
        let create_tx = self.submit(action, json!(request))?;
        let event = Event {
            event_id: request.event_id,
            start_time: request.start_time,
            end_time: request.end_time,
            target_kw: request.target_kw,
            reward_rate: request.reward_rate,
            penalty_rate: request.penalty_rate,
            status: EventStatus::Active,
            create_tx,
            close_tx: None,
            created_at: now_utc(),
            closed_at: None,
            settled_at: None,
        };

        self.commit_submitted(
            Mutation::InsertEvent {
                event: event.clone(),
            },
            action,
            &event.event_id,
            None,
            &event.create_tx,
        )?;
        tracing::info!(
            event_id = %event.event_id,
            target_kw = event.target_kw,
            handle = %event.create_tx.handle,
            "event created"
        );
        Ok(event)
    }

    /// Closes an active event.
    pub fn close_event(&self, event_id: &EventId) -> Result<Event, EngineError> {
        let mut event = self.require_event(event_id)?;
        match event.status {
            EventStatus::Active => {}
            EventStatus::Closed => {
                return Err(EngineError::EventAlreadyClosed {
                    event_id: event_id.clone(),
                })
            }
            EventStatus::Settled => {
                return Err(EngineError::EventAlreadySettled {
                    event_id: event_id.clone(),
                })
            }
        }

        let action = LedgerAction::CloseEvent;
        let close_tx = self.submit(action, json!({ "event_id": event_id }))?;
        let closed_at = now_utc();
        self.commit_submitted(
            Mutation::CloseEvent {
                event_id: event_id.clone(),
                close_tx: close_tx.clone(),
                closed_at,
            },
            action,
            event_id,
            None,
            &close_tx,
        )?;

        tracing::info!(event_id = %event_id, handle = %close_tx.handle, "event closed");
        event.status = EventStatus::Closed;
        event.close_tx = Some(close_tx);
        event.closed_at = Some(closed_at);
        Ok(event)
    }

    /// Canonicalizes, hashes and records a site's proof.
    pub fn submit_proof(&self, submission: ProofSubmission) -> Result<Proof, EngineError> {
        let event = self.require_event(&submission.event_id)?;
        if event.status != EventStatus::Active {
            return Err(EngineError::EventNotActive {
                event_id: event.event_id,
                status: event.status,
            });
        }
        if self
            .store
            .get_proof(&submission.event_id, &submission.site_id)?
            .is_some()
        {
            return Err(EngineError::ProofExists {
                event_id: submission.event_id,
                site_id: submission.site_id,
            });
        }

        let submitted_at = now_utc();
        let canonical = proof_codec::canonicalize(
            &ProofInput {
                event_id: &submission.event_id,
                site_id: &submission.site_id,
                baseline_kwh: submission.baseline_kwh,
                actual_kwh: submission.actual_kwh,
                method: &submission.baseline_method,
                raw_payload: submission.raw_payload.as_ref(),
                created_at: submitted_at,
            },
            &self.canonicalizer,
        )?;
        if let Some(declared) = &submission.proof_hash {
            if !proof_codec::declared_hash_matches(declared, &canonical.proof_hash) {
                return Err(EngineError::ProofHashMismatch {
                    declared: declared.clone(),
                    computed: canonical.proof_hash,
                });
            }
        }
        self.check_proof_size(&canonical.payload, &submission.uri)?;

        let action = LedgerAction::SubmitProof;
        let submit_tx = self.submit(
            action,
            json!({
                "event_id": submission.event_id,
                "site_id": submission.site_id,
                "baseline_kwh": submission.baseline_kwh,
                "actual_kwh": submission.actual_kwh,
                "proof_hash": canonical.proof_hash,
                "uri": submission.uri,
            }),
        )?;
        let proof = Proof {
            event_id: submission.event_id,
            site_id: submission.site_id,
            baseline_kwh: submission.baseline_kwh,
            actual_kwh: submission.actual_kwh,
            reduction_kwh: canonical.reduction_kwh,
            baseline_method: submission.baseline_method,
            uri: submission.uri,
            payload: canonical.payload,
            proof_hash: canonical.proof_hash,
            submit_tx,
            submitter: submission.submitter,
            submitted_at,
        };

        self.commit_submitted(
            Mutation::InsertProof {
                proof: proof.clone(),
            },
            action,
            &proof.event_id,
            Some(&proof.site_id),
            &proof.submit_tx,
        )?;
        tracing::info!(
            event_id = %proof.event_id,
            site_id = %proof.site_id,
            reduction_kwh = proof.reduction_kwh,
            proof_hash = %proof.proof_hash,
            "proof submitted"
        );
        Ok(proof)
    }

    /// Computes payouts for a closed event and settles it in one batch.
    ///
    /// An empty `site_ids` settles every site with a proof, in site order.
    /// Duplicates are dropped, keeping first occurrences.
    pub fn settle_event(
        &self,
        event_id: &EventId,
        site_ids: &[SiteId],
    ) -> Result<Vec<Settlement>, EngineError> {
        let event = self.require_event(event_id)?;
        match event.status {
            EventStatus::Closed => {}
            EventStatus::Settled => {
                return Err(EngineError::EventAlreadySettled {
                    event_id: event_id.clone(),
                })
            }
            EventStatus::Active => {
                return Err(EngineError::EventNotClosed {
                    event_id: event_id.clone(),
                })
            }
        }

        let requested: Vec<SiteId> = if site_ids.is_empty() {
            self.store
                .list_proofs(event_id)?
                .into_iter()
                .map(|p| p.site_id)
                .collect()
        } else {
            site_ids.to_vec()
        };
        let mut sites: Vec<SiteId> = Vec::with_capacity(requested.len());
        for site in requested {
            if !sites.contains(&site) {
                sites.push(site);
            }
        }
        let share = scorer::target_share(event.target_kw, sites.len()).ok_or_else(|| {
            EngineError::EmptySiteIds {
                event_id: event_id.clone(),
            }
        })?;

        let mut payouts = Vec::with_capacity(sites.len());
        for site in &sites {
            let proof = self.store.get_proof(event_id, site)?.ok_or_else(|| {
                EngineError::ProofMissing {
                    event_id: event_id.clone(),
                    site_id: site.clone(),
                }
            })?;
            if self.store.get_settlement(event_id, site)?.is_some() {
                return Err(EngineError::AlreadySettled {
                    event_id: event_id.clone(),
                    site_id: site.clone(),
                });
            }
            let payout = scorer::payout(
                proof.reduction_kwh,
                share,
                event.reward_rate,
                event.penalty_rate,
            );
            payouts.push((site.clone(), payout));
        }

        let action = LedgerAction::SettleEvent;
        let settle_tx = self.submit(
            action,
            json!({ "event_id": event_id, "site_ids": sites }),
        )?;
        let settled_at = now_utc();
        let settlements: Vec<Settlement> = payouts
            .into_iter()
            .map(|(site_id, payout)| Settlement {
                event_id: event_id.clone(),
                site_id,
                payout,
                status: SettlementStatus::Settled,
                settle_tx: settle_tx.clone(),
                claim_tx: None,
                settled_at,
                claimed_at: None,
            })
            .collect();

        self.commit_submitted(
            Mutation::SettleEvent {
                event_id: event_id.clone(),
                settlements: settlements.clone(),
                settled_at,
            },
            action,
            event_id,
            None,
            &settle_tx,
        )?;
        tracing::info!(
            event_id = %event_id,
            sites = settlements.len(),
            target_share = share,
            handle = %settle_tx.handle,
            "event settled"
        );
        Ok(settlements)
    }

    /// Claims a settled payout on behalf of the proof submitter.
    pub fn claim_reward(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
        claimant: &ActorId,
    ) -> Result<Settlement, EngineError> {
        let mut settlement = self.store.get_settlement(event_id, site_id)?.ok_or_else(|| {
            EngineError::SettlementNotFound {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
            }
        })?;
        if settlement.status != SettlementStatus::Settled {
            return Err(EngineError::NotClaimable {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
                status: settlement.status,
            });
        }
        let proof = self.store.get_proof(event_id, site_id)?.ok_or_else(|| {
            EngineError::ProofNotFound {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
            }
        })?;
        if &proof.submitter != claimant {
            return Err(EngineError::NotProofSubmitter {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
                claimant: claimant.clone(),
            });
        }

        let action = LedgerAction::ClaimReward;
        let claim_tx = self.submit(
            action,
            json!({ "event_id": event_id, "site_id": site_id }),
        )?;
        let claimed_at = now_utc();
        self.commit_submitted(
            Mutation::ClaimSettlement {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
                claim_tx: claim_tx.clone(),
                claimed_at,
            },
            action,
            event_id,
            Some(site_id),
            &claim_tx,
        )?;

        tracing::info!(
            event_id = %event_id,
            site_id = %site_id,
            payout = settlement.payout,
            handle = %claim_tx.handle,
            "reward claimed"
        );
        settlement.status = SettlementStatus::Claimed;
        settlement.claim_tx = Some(claim_tx);
        settlement.claimed_at = Some(claimed_at);
        Ok(settlement)
    }

    /// Event after reconciling its transactions.
    pub fn get_event(&self, event_id: &EventId) -> Result<Event, EngineError> {
        self.reconcile_event(event_id)?;
        self.require_event(event_id)
    }

    /// Settlements of an event in site order, after reconciliation.
    pub fn list_settlements(&self, event_id: &EventId) -> Result<Vec<Settlement>, EngineError> {
        self.reconcile_event(event_id)?;
        self.require_event(event_id)?;
        Ok(self.store.list_settlements(event_id)?)
    }

    /// Proof after reconciling its event's transactions.
    pub fn get_proof(&self, event_id: &EventId, site_id: &SiteId) -> Result<Proof, EngineError> {
        self.reconcile_event(event_id)?;
        self.require_proof(event_id, site_id)
    }

    /// Recomputes a proof's hash from its stored payload and records the
    /// audit request.
    pub fn get_audit(&self, event_id: &EventId, site_id: &SiteId) -> Result<AuditReport, EngineError> {
        let proof = self.require_proof(event_id, site_id)?;
        let requested_at = now_utc();
        self.store.commit(Mutation::UpsertAudit {
            request: AuditRequest {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
                requested_at,
            },
        })?;

        let recomputed_hash = proof_codec::recompute(&proof.payload);
        let matches = recomputed_hash == proof.proof_hash;
        if matches {
            tracing::info!(event_id = %event_id, site_id = %site_id, "proof audited");
        } else {
            tracing::warn!(
                event_id = %event_id,
                site_id = %site_id,
                stored = %proof.proof_hash,
                recomputed = %recomputed_hash,
                "proof audit mismatch"
            );
        }
        Ok(AuditReport {
            event_id: proof.event_id,
            site_id: proof.site_id,
            stored_hash: proof.proof_hash,
            recomputed_hash,
            matches,
            raw_uri: proof.uri,
            requested_at,
        })
    }

    /// Progress summary of an event, after reconciliation.
    pub fn get_summary(&self, event_id: &EventId) -> Result<ProgressSummary, EngineError> {
        self.reconcile_event(event_id)?;
        let event = self.require_event(event_id)?;
        let proofs = self.store.list_proofs(event_id)?;
        let settlements = self.store.list_settlements(event_id)?;
        let audit = self.store.get_audit(event_id, self.config.focus_site())?;
        Ok(summary::project(
            &event,
            &proofs,
            &settlements,
            audit.as_ref(),
            &self.config,
        ))
    }

    /// Runs one reconciliation pass over `scope`.
    ///
    /// Fails with `CHAIN_TX_FAILED` if any check failed and with
    /// `STORAGE_FAILURE` if the pass could not be committed.
    pub fn reconcile(&self, scope: &TxScope) -> Result<ReconcileReport, EngineError> {
        reconcile::run_pass(&self.store, &self.ledger, scope)
    }

    /// Ledger actions that went through without a local commit.
    pub fn list_orphans(&self) -> Result<Vec<OrphanTx>, EngineError> {
        Ok(self.store.list_orphans()?)
    }

    fn reconcile_event(&self, event_id: &EventId) -> Result<(), EngineError> {
        self.reconcile(&TxScope::Event(event_id.clone()))
            .map(|_| ())
            .map_err(|err| {
                tracing::warn!(event_id = %event_id, error = %err, "read reconciliation failed");
                err
            })
    }

    /// Rejects a proof whose commit record the store could not persist, so
    /// that no ledger transaction is spent on it.
    fn check_proof_size(&self, payload: &str, uri: &str) -> Result<(), EngineError> {
        let Some(max) = self.store.max_commit_bytes() else {
            return Ok(());
        };
        let size = Value::from(payload).to_string().len()
            + Value::from(uri).to_string().len()
            + PROOF_RECORD_HEADROOM;
        if size > max {
            tracing::warn!(size, max, "proof record too large for the store");
            return Err(EngineError::ProofTooLarge { size, max });
        }
        Ok(())
    }

    fn require_event(&self, event_id: &EventId) -> Result<Event, EngineError> {
        self.store
            .get_event(event_id)?
            .ok_or_else(|| EngineError::EventNotFound {
                event_id: event_id.clone(),
            })
    }

    fn require_proof(&self, event_id: &EventId, site_id: &SiteId) -> Result<Proof, EngineError> {
        self.store
            .get_proof(event_id, site_id)?
            .ok_or_else(|| EngineError::ProofNotFound {
                event_id: event_id.clone(),
                site_id: site_id.clone(),
            })
    }

    fn submit(&self, action: LedgerAction, payload: Value) -> Result<TxRecord, EngineError> {
        let result = self
            .ledger
            .submit(action, &payload, self.config.confirm_mode())
            .map_err(|source| {
                tracing::warn!(action = %action, error = %source, "ledger submit failed");
                EngineError::Ledger { action, source }
            })?;
        tracing::debug!(
            action = %action,
            handle = %result.handle,
            state = result.outcome.state().as_str(),
            "ledger submit accepted"
        );
        Ok(TxRecord::from_result(result))
    }

    /// Commits the mutation that persists a ledger action. On failure the
    /// action is recorded as an orphan and the store error is mapped.
    fn commit_submitted(
        &self,
        mutation: Mutation,
        action: LedgerAction,
        event_id: &EventId,
        site_id: Option<&SiteId>,
        tx: &TxRecord,
    ) -> Result<(), EngineError> {
        let err = match self.store.commit(mutation) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        tracing::error!(
            action = %action,
            event_id = %event_id,
            handle = %tx.handle,
            error = %err,
            "ledger transaction has no local commit"
        );
        let orphan = OrphanTx {
            action,
            event_id: event_id.clone(),
            site_id: site_id.cloned(),
            tx: tx.clone(),
            reason: err.to_string(),
            recorded_at: now_utc(),
        };
        if let Err(record_err) = self.store.commit(Mutation::RecordOrphan { orphan }) {
            tracing::error!(
                handle = %tx.handle,
                error = %record_err,
                "failed to record orphan transaction"
            );
        }

        Err(map_commit_error(err, action, tx))
    }
}

fn map_commit_error(err: StoreError, action: LedgerAction, tx: &TxRecord) -> EngineError {
    let conflict = match err {
        StoreError::Conflict(conflict) => conflict,
        source => {
            return EngineError::Storage {
                source,
                orphan_tx: Some(tx.handle.clone()),
            }
        }
    };
    match conflict {
        Conflict::EventExists { event_id } => EngineError::EventExists { event_id },
        Conflict::ProofExists { event_id, site_id } => {
            EngineError::ProofExists { event_id, site_id }
        }
        Conflict::SettlementExists { event_id, site_id } => {
            EngineError::AlreadySettled { event_id, site_id }
        }
        Conflict::EventStatus {
            event_id, found, ..
        } => match (action, found) {
            (LedgerAction::SubmitProof, status) => EngineError::EventNotActive { event_id, status },
            (_, EventStatus::Closed) => EngineError::EventAlreadyClosed { event_id },
            (_, EventStatus::Settled) => EngineError::EventAlreadySettled { event_id },
            (_, EventStatus::Active) => EngineError::EventNotClosed { event_id },
        },
        Conflict::SettlementStatus {
            event_id,
            site_id,
            found,
        } => EngineError::NotClaimable {
            event_id,
            site_id,
            status: found,
        },
    }
}
