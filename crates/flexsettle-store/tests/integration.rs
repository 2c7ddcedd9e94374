mod common;

use common::*;
use flexsettle_core::{AuditRequest, EventStatus, SettlementStatus, TxState};
use flexsettle_store::{
    Conflict, LedgerIndexStore, MemoryStore, Mutation, StoreError, TxRef, TxScope, TxSlot,
    TxUpdate,
};

fn confirmed(handle: &str) -> flexsettle_core::TxRecord {
    make_tx(handle, TxState::Confirmed)
}

fn seed_closed_event(store: &MemoryStore, id: &str, sites: &[&str]) {
    store
        .commit(Mutation::InsertEvent {
            event: make_event(id, confirmed("0xc1")),
        })
        .unwrap();
    for s in sites {
        store
            .commit(Mutation::InsertProof {
                proof: make_proof(id, s, confirmed("0xp1")),
            })
            .unwrap();
    }
    store
        .commit(Mutation::CloseEvent {
            event_id: event_id(id),
            close_tx: confirmed("0xcl"),
            closed_at: make_time(),
        })
        .unwrap();
}

#[test]
fn test_insert_event_rejects_duplicate() {
    let store = MemoryStore::new();
    let event = make_event("evt-1", confirmed("0x01"));
    store
        .commit(Mutation::InsertEvent {
            event: event.clone(),
        })
        .unwrap();

    match store.commit(Mutation::InsertEvent { event }) {
        Err(StoreError::Conflict(Conflict::EventExists { event_id })) => {
            assert_eq!(event_id.as_str(), "evt-1")
        }
        other => panic!("Expected EventExists, got {:?}", other),
    }
    assert_eq!(store.list_events().unwrap().len(), 1);
}

#[test]
fn test_close_is_compare_and_set() {
    let store = MemoryStore::new();
    seed_closed_event(&store, "evt-1", &[]);

    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Closed);
    assert_eq!(event.closed_at, Some(make_time()));

    match store.commit(Mutation::CloseEvent {
        event_id: event_id("evt-1"),
        close_tx: confirmed("0x02"),
        closed_at: make_time(),
    }) {
        Err(StoreError::Conflict(Conflict::EventStatus {
            expected, found, ..
        })) => {
            assert_eq!(expected, EventStatus::Active);
            assert_eq!(found, EventStatus::Closed);
        }
        other => panic!("Expected EventStatus conflict, got {:?}", other),
    }
    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.close_tx.unwrap().handle.as_str(), "0xcl");
}

#[test]
fn test_close_missing_event_is_not_found() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.commit(Mutation::CloseEvent {
            event_id: event_id("ghost"),
            close_tx: confirmed("0x02"),
            closed_at: make_time(),
        }),
        Err(StoreError::NotFound { entity: "event", .. })
    ));
}

#[test]
fn test_proof_requires_active_event_and_unique_key() {
    let store = MemoryStore::new();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-1", confirmed("0x01")),
        })
        .unwrap();
    store
        .commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-a", confirmed("0x02")),
        })
        .unwrap();

    assert!(matches!(
        store.commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-a", confirmed("0x03")),
        }),
        Err(StoreError::Conflict(Conflict::ProofExists { .. }))
    ));

    store
        .commit(Mutation::CloseEvent {
            event_id: event_id("evt-1"),
            close_tx: confirmed("0x04"),
            closed_at: make_time(),
        })
        .unwrap();
    assert!(matches!(
        store.commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-b", confirmed("0x05")),
        }),
        Err(StoreError::Conflict(Conflict::EventStatus {
            found: EventStatus::Closed,
            ..
        }))
    ));
}

#[test]
fn test_lists_are_in_site_order_and_scoped() {
    let store = MemoryStore::new();
    for id in ["evt-1", "evt-2"] {
        store
            .commit(Mutation::InsertEvent {
                event: make_event(id, confirmed("0x01")),
            })
            .unwrap();
    }
    for s in ["site-c", "site-a", "site-b"] {
        store
            .commit(Mutation::InsertProof {
                proof: make_proof("evt-1", s, confirmed("0x02")),
            })
            .unwrap();
    }
    store
        .commit(Mutation::InsertProof {
            proof: make_proof("evt-2", "site-a", confirmed("0x03")),
        })
        .unwrap();

    let sites: Vec<String> = store
        .list_proofs(&event_id("evt-1"))
        .unwrap()
        .into_iter()
        .map(|p| p.site_id.to_string())
        .collect();
    assert_eq!(sites, vec!["site-a", "site-b", "site-c"]);
    assert_eq!(store.list_proofs(&event_id("evt-2")).unwrap().len(), 1);
    assert!(store.list_proofs(&event_id("evt-3")).unwrap().is_empty());
}

#[test]
fn test_settle_inserts_rows_and_flips_status() {
    let store = MemoryStore::new();
    seed_closed_event(&store, "evt-1", &["site-a", "site-b"]);

    store
        .commit(Mutation::SettleEvent {
            event_id: event_id("evt-1"),
            settlements: vec![
                make_settlement("evt-1", "site-a", confirmed("0xs1")),
                make_settlement("evt-1", "site-b", confirmed("0xs1")),
            ],
            settled_at: make_time(),
        })
        .unwrap();

    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Settled);
    assert_eq!(store.list_settlements(&event_id("evt-1")).unwrap().len(), 2);

    // second settle loses the status compare-and-set
    assert!(matches!(
        store.commit(Mutation::SettleEvent {
            event_id: event_id("evt-1"),
            settlements: vec![make_settlement("evt-1", "site-a", confirmed("0xs2"))],
            settled_at: make_time(),
        }),
        Err(StoreError::Conflict(Conflict::EventStatus {
            found: EventStatus::Settled,
            ..
        }))
    ));
}

#[test]
fn test_settle_rejects_site_without_proof_atomically() {
    let store = MemoryStore::new();
    seed_closed_event(&store, "evt-1", &["site-a"]);

    assert!(matches!(
        store.commit(Mutation::SettleEvent {
            event_id: event_id("evt-1"),
            settlements: vec![
                make_settlement("evt-1", "site-a", confirmed("0xs1")),
                make_settlement("evt-1", "site-z", confirmed("0xs1")),
            ],
            settled_at: make_time(),
        }),
        Err(StoreError::NotFound { entity: "proof", .. })
    ));
    assert!(store.list_settlements(&event_id("evt-1")).unwrap().is_empty());
    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Closed);
}

#[test]
fn test_claim_exactly_once() {
    let store = MemoryStore::new();
    seed_closed_event(&store, "evt-1", &["site-a"]);
    store
        .commit(Mutation::SettleEvent {
            event_id: event_id("evt-1"),
            settlements: vec![make_settlement("evt-1", "site-a", confirmed("0xs1"))],
            settled_at: make_time(),
        })
        .unwrap();

    let claim = || Mutation::ClaimSettlement {
        event_id: event_id("evt-1"),
        site_id: site("site-a"),
        claim_tx: confirmed("0xcc"),
        claimed_at: make_time(),
    };
    store.commit(claim()).unwrap();
    let row = store
        .get_settlement(&event_id("evt-1"), &site("site-a"))
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SettlementStatus::Claimed);

    assert!(matches!(
        store.commit(claim()),
        Err(StoreError::Conflict(Conflict::SettlementStatus {
            found: SettlementStatus::Claimed,
            ..
        }))
    ));
}

#[test]
fn test_audit_upsert_keeps_latest() {
    let store = MemoryStore::new();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-1", confirmed("0x01")),
        })
        .unwrap();

    let request = |hours| AuditRequest {
        event_id: event_id("evt-1"),
        site_id: site("site-a"),
        requested_at: make_time() + chrono::Duration::hours(hours),
    };
    assert!(matches!(
        store.commit(Mutation::UpsertAudit { request: request(0) }),
        Err(StoreError::NotFound { entity: "proof", .. })
    ));

    store
        .commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-a", confirmed("0x02")),
        })
        .unwrap();
    store
        .commit(Mutation::UpsertAudit { request: request(1) })
        .unwrap();
    store
        .commit(Mutation::UpsertAudit { request: request(2) })
        .unwrap();

    let audit = store
        .get_audit(&event_id("evt-1"), &site("site-a"))
        .unwrap()
        .unwrap();
    assert_eq!(audit.requested_at, make_time() + chrono::Duration::hours(2));
}

#[test]
fn test_pending_transactions_only_lists_unresolved() {
    let store = MemoryStore::new();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-1", make_tx("0xaa", TxState::Submitted)),
        })
        .unwrap();
    store
        .commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-a", confirmed("0xbb")),
        })
        .unwrap();
    store
        .commit(Mutation::InsertProof {
            proof: make_proof("evt-1", "site-b", make_tx("0xcc", TxState::Submitted)),
        })
        .unwrap();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-2", make_tx("0xdd", TxState::Submitted)),
        })
        .unwrap();

    let scoped = store
        .pending_transactions(&TxScope::Event(event_id("evt-1")))
        .unwrap();
    let handles: Vec<&str> = scoped.iter().map(|p| p.record.handle.as_str()).collect();
    assert_eq!(handles, vec!["0xaa", "0xcc"]);
    assert_eq!(
        scoped[1].target,
        TxRef {
            event_id: event_id("evt-1"),
            slot: TxSlot::ProofSubmit(site("site-b")),
        }
    );

    assert_eq!(store.pending_transactions(&TxScope::All).unwrap().len(), 3);
}

#[test]
fn test_tx_updates_only_advance_submitted_records() {
    let store = MemoryStore::new();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-1", make_tx("0xaa", TxState::Submitted)),
        })
        .unwrap();

    let target = TxRef {
        event_id: event_id("evt-1"),
        slot: TxSlot::EventCreate,
    };
    let mut failed = make_tx("0xaa", TxState::Failed);
    failed.error = Some("reverted".to_string());

    store
        .commit(Mutation::ApplyTxUpdates {
            updates: vec![TxUpdate {
                target: target.clone(),
                record: confirmed("0xaa"),
            }],
        })
        .unwrap();
    // terminal records are left alone
    store
        .commit(Mutation::ApplyTxUpdates {
            updates: vec![
                TxUpdate {
                    target: target.clone(),
                    record: failed,
                },
                TxUpdate {
                    target: TxRef {
                        event_id: event_id("ghost"),
                        slot: TxSlot::EventCreate,
                    },
                    record: confirmed("0xee"),
                },
            ],
        })
        .unwrap();

    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.create_tx.state, TxState::Confirmed);
    assert!(store.pending_transactions(&TxScope::All).unwrap().is_empty());
}

#[test]
fn test_tx_update_ignores_handle_mismatch() {
    let store = MemoryStore::new();
    store
        .commit(Mutation::InsertEvent {
            event: make_event("evt-1", make_tx("0xaa", TxState::Submitted)),
        })
        .unwrap();

    store
        .commit(Mutation::ApplyTxUpdates {
            updates: vec![TxUpdate {
                target: TxRef {
                    event_id: event_id("evt-1"),
                    slot: TxSlot::EventCreate,
                },
                record: confirmed("0xbb"),
            }],
        })
        .unwrap();

    let event = store.get_event(&event_id("evt-1")).unwrap().unwrap();
    assert_eq!(event.create_tx.state, TxState::Submitted);
}
