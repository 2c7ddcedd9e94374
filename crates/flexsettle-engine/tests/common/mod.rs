#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use flexsettle_canonical::{ActorId, EventId, MethodTag, SiteId, TxHandle};
use flexsettle_core::{
    AuditRequest, ConfirmMode, EngineConfig, Event, LedgerAction, LedgerAdapter, LedgerError,
    OrphanTx, Proof, Settlement, SimulatedLedger, TxCheck, TxResult,
};
use flexsettle_engine::{Engine, NewEvent, ProofSubmission};
use flexsettle_store::{LedgerIndexStore, MemoryStore, Mutation, PendingTx, StoreError, TxScope};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn make_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 17, 10, 0, 0).unwrap()
}

pub fn event_id(id: &str) -> EventId {
    EventId::parse(id).unwrap()
}

pub fn site(id: &str) -> SiteId {
    SiteId::parse(id).unwrap()
}

pub fn actor(id: &str) -> ActorId {
    ActorId::parse(id).unwrap()
}

pub fn config(mode: ConfirmMode) -> EngineConfig {
    EngineConfig::new(vec![site("site-a"), site("site-b")], mode).unwrap()
}

pub fn new_event(id: &str) -> NewEvent {
    NewEvent {
        event_id: event_id(id),
        start_time: make_time(),
        end_time: make_time() + Duration::hours(2),
        target_kw: 200,
        reward_rate: 10,
        penalty_rate: 5,
    }
}

pub fn submission(event: &str, site_id: &str, baseline: u64, actual: u64) -> ProofSubmission {
    ProofSubmission {
        event_id: event_id(event),
        site_id: site(site_id),
        baseline_kwh: baseline,
        actual_kwh: actual,
        baseline_method: MethodTag::parse("simple").unwrap(),
        uri: format!("s3://meters/{}/{}.csv", event, site_id),
        raw_payload: None,
        proof_hash: None,
        submitter: actor(&format!("operator@{}", site_id)),
    }
}

/// Ledger wrapper that counts checks per handle and can be told to fail.
#[derive(Default)]
pub struct SpyLedger {
    inner: SimulatedLedger,
    checks: Mutex<HashMap<TxHandle, usize>>,
    submits: Mutex<Vec<LedgerAction>>,
    fail_submit: Mutex<Option<LedgerError>>,
    fail_checks: AtomicBool,
    failing_handles: Mutex<HashSet<TxHandle>>,
}

impl SpyLedger {
    pub fn new(checks_until_confirm: u32) -> Self {
        Self {
            inner: SimulatedLedger::new(checks_until_confirm),
            ..Self::default()
        }
    }

    pub fn checks_for(&self, handle: &TxHandle) -> usize {
        self.checks.lock().unwrap().get(handle).copied().unwrap_or(0)
    }

    pub fn total_checks(&self) -> usize {
        self.checks.lock().unwrap().values().sum()
    }

    pub fn submits(&self) -> Vec<LedgerAction> {
        self.submits.lock().unwrap().clone()
    }

    pub fn fail_next_submit(&self, err: LedgerError) {
        *self.fail_submit.lock().unwrap() = Some(err);
    }

    pub fn set_fail_checks(&self, fail: bool) {
        self.fail_checks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_checks_for(&self, handle: &TxHandle) {
        self.failing_handles.lock().unwrap().insert(handle.clone());
    }
}

impl LedgerAdapter for SpyLedger {
    fn submit(
        &self,
        action: LedgerAction,
        payload: &Value,
        mode: ConfirmMode,
    ) -> Result<TxResult, LedgerError> {
        if let Some(err) = self.fail_submit.lock().unwrap().take() {
            return Err(err);
        }
        self.submits.lock().unwrap().push(action);
        self.inner.submit(action, payload, mode)
    }

    fn check(&self, handle: &TxHandle) -> Result<TxCheck, LedgerError> {
        *self.checks.lock().unwrap().entry(handle.clone()).or_insert(0) += 1;
        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger unreachable".to_string()));
        }
        if self.failing_handles.lock().unwrap().contains(handle) {
            return Err(LedgerError::Malformed("unknown state".to_string()));
        }
        self.inner.check(handle)
    }
}

/// Store wrapper whose commits of one mutation kind fail with an I/O error.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_op: Mutex<Option<&'static str>>,
}

impl FlakyStore {
    pub fn fail_commits_of(&self, op: &'static str) {
        *self.fail_op.lock().unwrap() = Some(op);
    }
}

impl LedgerIndexStore for FlakyStore {
    fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        if *self.fail_op.lock().unwrap() == Some(mutation.op()) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.commit(mutation)
    }

    fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        self.inner.get_event(event_id)
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.inner.list_events()
    }

    fn get_proof(&self, event_id: &EventId, site_id: &SiteId) -> Result<Option<Proof>, StoreError> {
        self.inner.get_proof(event_id, site_id)
    }

    fn list_proofs(&self, event_id: &EventId) -> Result<Vec<Proof>, StoreError> {
        self.inner.list_proofs(event_id)
    }

    fn get_settlement(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<Settlement>, StoreError> {
        self.inner.get_settlement(event_id, site_id)
    }

    fn list_settlements(&self, event_id: &EventId) -> Result<Vec<Settlement>, StoreError> {
        self.inner.list_settlements(event_id)
    }

    fn get_audit(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<AuditRequest>, StoreError> {
        self.inner.get_audit(event_id, site_id)
    }

    fn pending_transactions(&self, scope: &TxScope) -> Result<Vec<PendingTx>, StoreError> {
        self.inner.pending_transactions(scope)
    }

    fn list_orphans(&self) -> Result<Vec<OrphanTx>, StoreError> {
        self.inner.list_orphans()
    }
}

pub type SpyEngine = Engine<MemoryStore, Arc<SpyLedger>>;

/// Engine over a memory store and a spy ledger that confirms hybrid
/// submissions on their first check.
pub fn spy_engine(mode: ConfirmMode) -> (SpyEngine, Arc<SpyLedger>) {
    let ledger = Arc::new(SpyLedger::new(1));
    let engine = Engine::new(MemoryStore::new(), Arc::clone(&ledger), config(mode));
    (engine, ledger)
}

/// Runs an event to the closed state with proofs for site-a (reduction 110)
/// and site-b (reduction 30).
pub fn closed_e1<S, L>(engine: &Engine<S, L>) -> EventId
where
    S: LedgerIndexStore,
    L: LedgerAdapter,
{
    engine.create_event(new_event("E1")).unwrap();
    engine
        .submit_proof(submission("E1", "site-a", 150, 40))
        .unwrap();
    engine
        .submit_proof(submission("E1", "site-b", 150, 120))
        .unwrap();
    engine.close_event(&event_id("E1")).unwrap();
    event_id("E1")
}
