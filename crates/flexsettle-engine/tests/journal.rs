//! Engine over the journal-backed store.

mod common;

use common::*;
use flexsettle_core::{
    ConfirmMode, EventStatus, LedgerAction, SettlementStatus, SimulatedLedger, TxState,
};
use flexsettle_engine::{Engine, ErrorKind};
use flexsettle_store::{JournalStore, LedgerIndexStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn open_engine(path: &std::path::Path, mode: ConfirmMode) -> Engine<JournalStore, SimulatedLedger> {
    Engine::new(
        JournalStore::open(path).unwrap(),
        SimulatedLedger::default(),
        config(mode),
    )
}

#[test]
fn test_workflow_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flexsettle.fsj");

    {
        let engine = open_engine(&path, ConfirmMode::Sync);
        let e1 = closed_e1(&engine);
        engine.settle_event(&e1, &[]).unwrap();
    }

    let engine = open_engine(&path, ConfirmMode::Sync);
    let e1 = event_id("E1");
    assert_eq!(engine.get_event(&e1).unwrap().status, EventStatus::Settled);
    let payouts: Vec<i64> = engine
        .list_settlements(&e1)
        .unwrap()
        .iter()
        .map(|s| s.payout)
        .collect();
    assert_eq!(payouts, vec![1000, -50]);

    let claimed = engine
        .claim_reward(&e1, &site("site-a"), &actor("operator@site-a"))
        .unwrap();
    assert_eq!(claimed.status, SettlementStatus::Claimed);

    let report = engine.get_audit(&e1, &site("site-b")).unwrap();
    assert!(report.matches);
}

#[test]
fn test_pending_transactions_reconcile_after_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flexsettle.fsj");

    {
        let engine = open_engine(&path, ConfirmMode::Hybrid);
        engine.create_event(new_event("E1")).unwrap();
    }

    // The fresh simulated ledger never issued the handle and reports it
    // confirmed.
    let engine = open_engine(&path, ConfirmMode::Hybrid);
    let event = engine.get_event(&event_id("E1")).unwrap();
    assert_eq!(event.create_tx.state, TxState::Confirmed);

    drop(engine);
    let store = JournalStore::open(&path).unwrap();
    assert_eq!(store.commit_count().unwrap(), 2);
}

#[test]
fn test_rejected_operation_leaves_journal_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flexsettle.fsj");

    let engine = open_engine(&path, ConfirmMode::Sync);
    engine.create_event(new_event("E1")).unwrap();
    let before = std::fs::metadata(&path).unwrap().len();

    assert!(engine.create_event(new_event("E1")).is_err());
    assert!(engine.settle_event(&event_id("E1"), &[]).is_err());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), before);
}

#[test]
fn test_oversized_proof_rejected_before_ledger_submit() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flexsettle.fsj");
    let ledger = Arc::new(SpyLedger::new(1));
    let engine = Engine::new(
        JournalStore::open(&path).unwrap(),
        Arc::clone(&ledger),
        config(ConfirmMode::Sync),
    );
    engine.create_event(new_event("E1")).unwrap();
    let before = std::fs::metadata(&path).unwrap().len();

    let mut oversized = submission("E1", "site-a", 150, 40);
    oversized.raw_payload = Some(json!({ "samples": "7".repeat(17 * 1024 * 1024) }));
    for _ in 0..2 {
        let err = engine.submit_proof(oversized.clone()).unwrap_err();
        assert_eq!(err.code(), "INVALID_PROOF_PAYLOAD");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.retryable());
        assert_eq!(
            err.details()["max"],
            engine.store().max_commit_bytes().unwrap()
        );
    }

    assert_eq!(ledger.submits(), vec![LedgerAction::CreateEvent]);
    assert!(engine.list_orphans().unwrap().is_empty());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), before);

    let proof = engine
        .submit_proof(submission("E1", "site-a", 150, 40))
        .unwrap();
    assert_eq!(proof.reduction_kwh, 110);
}

#[test]
fn test_commit_size_limit_comes_from_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = JournalStore::open(temp_dir.path().join("flexsettle.fsj")).unwrap();
    let max = store.max_commit_bytes().unwrap();
    assert!(max < 16 * 1024 * 1024);
    assert!(max > 16 * 1024 * 1024 - 1024);

    assert_eq!(MemoryStore::new().max_commit_bytes(), None);
}
