use chrono::{DateTime, TimeZone, Utc};
use flexsettle_canonical::{Canonicalizer, EventId, MethodTag, ProofHash, SiteId, TxHandle};
use flexsettle_core::{
    proof_codec::{self, ProofInput},
    scorer, CodecError, TxCheck, TxOutcome, TxRecord, TxResult, TxState,
};
use serde_json::json;

fn make_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 17, 10, 0, 0).unwrap()
}

fn make_event_id() -> EventId {
    EventId::parse("evt-1").unwrap()
}

fn make_site() -> SiteId {
    SiteId::parse("site-a").unwrap()
}

fn make_method() -> MethodTag {
    MethodTag::parse("simple").unwrap()
}

fn make_submitted(handle: &str) -> TxRecord {
    TxRecord {
        handle: TxHandle::parse(handle).unwrap(),
        fee_wei: None,
        state: TxState::Submitted,
        submitted_at: make_time(),
        confirmed_at: None,
        error: None,
    }
}

#[test]
fn test_reduction_never_negative() {
    assert_eq!(proof_codec::reduction_kwh(100, 60), 40);
    assert_eq!(proof_codec::reduction_kwh(100, 100), 0);
    assert_eq!(proof_codec::reduction_kwh(50, 120), 0);
    assert_eq!(proof_codec::reduction_kwh(0, u64::MAX), 0);
}

#[test]
fn test_canonical_payload_bytes() {
    let event_id = make_event_id();
    let site = make_site();
    let method = make_method();
    let input = ProofInput {
        event_id: &event_id,
        site_id: &site,
        baseline_kwh: 100,
        actual_kwh: 60,
        method: &method,
        raw_payload: None,
        created_at: make_time(),
    };

    let proof = proof_codec::canonicalize(&input, &Canonicalizer::new()).unwrap();

    assert_eq!(
        proof.payload,
        r#"{"actual_kwh":60,"baseline_kwh":100,"baseline_method":"simple","created_at":"2026-02-17T10:00:00Z","event_id":"evt-1","raw_payload":{},"reduction_kwh":40,"site_id":"site-a"}"#
    );
    assert_eq!(proof.reduction_kwh, 40);
    assert_eq!(proof.proof_hash, ProofHash::sha256(proof.payload.as_bytes()));
    assert_eq!(proof.proof_hash.to_string().len(), 71);
}

#[test]
fn test_hash_is_independent_of_raw_payload_key_order() {
    let event_id = make_event_id();
    let site = make_site();
    let method = make_method();
    let first: serde_json::Value =
        serde_json::from_str(r#"{"meter":"m-7","readings":[1,2,3],"unit":"kwh"}"#).unwrap();
    let second: serde_json::Value =
        serde_json::from_str(r#"{"unit":"kwh","readings":[1,2,3],"meter":"m-7"}"#).unwrap();

    let build = |raw| ProofInput {
        event_id: &event_id,
        site_id: &site,
        baseline_kwh: 100,
        actual_kwh: 60,
        method: &method,
        raw_payload: Some(raw),
        created_at: make_time(),
    };
    let canonicalizer = Canonicalizer::new();
    let a = proof_codec::canonicalize(&build(&first), &canonicalizer).unwrap();
    let b = proof_codec::canonicalize(&build(&second), &canonicalizer).unwrap();

    assert_eq!(a.payload, b.payload);
    assert_eq!(a.proof_hash, b.proof_hash);
}

#[test]
fn test_audit_recompute_matches_stored_hash() {
    let event_id = make_event_id();
    let site = make_site();
    let method = make_method();
    let raw = json!({ "interval": "15m", "samples": [12, 11, 9] });
    let input = ProofInput {
        event_id: &event_id,
        site_id: &site,
        baseline_kwh: 42,
        actual_kwh: 40,
        method: &method,
        raw_payload: Some(&raw),
        created_at: make_time(),
    };

    let proof = proof_codec::canonicalize(&input, &Canonicalizer::new()).unwrap();
    assert_eq!(proof_codec::recompute(&proof.payload), proof.proof_hash);

    let tampered = proof.payload.replace("\"actual_kwh\":40", "\"actual_kwh\":4");
    assert_ne!(proof_codec::recompute(&tampered), proof.proof_hash);
}

#[test]
fn test_raw_payload_must_be_object() {
    let event_id = make_event_id();
    let site = make_site();
    let method = make_method();
    let raw = json!([1, 2, 3]);
    let input = ProofInput {
        event_id: &event_id,
        site_id: &site,
        baseline_kwh: 1,
        actual_kwh: 0,
        method: &method,
        raw_payload: Some(&raw),
        created_at: make_time(),
    };

    match proof_codec::canonicalize(&input, &Canonicalizer::new()) {
        Err(CodecError::RawPayloadNotObject(kind)) => assert_eq!(kind, "array"),
        other => panic!("Expected RawPayloadNotObject, got {:?}", other),
    }
}

#[test]
fn test_declared_hash_comparison() {
    let computed = ProofHash::sha256(b"payload");
    let upper = computed.to_string().to_uppercase().replace("SHA256:", "sha256:");

    assert!(proof_codec::declared_hash_matches(&computed.to_string(), &computed));
    assert!(proof_codec::declared_hash_matches(&upper, &computed));
    assert!(!proof_codec::declared_hash_matches("sha256:deadbeef", &computed));
    assert!(!proof_codec::declared_hash_matches(
        &ProofHash::sha256(b"other").to_string(),
        &computed
    ));
}

#[test]
fn test_target_share_floors() {
    assert_eq!(scorer::target_share(100, 2), Some(50));
    assert_eq!(scorer::target_share(100, 3), Some(33));
    assert_eq!(scorer::target_share(100, 0), None);
}

#[test]
fn test_payout_example_event() {
    // target 200 kW over two sites, reward 10, penalty 5
    let share = scorer::target_share(200, 2).unwrap();
    assert_eq!(share, 100);
    assert_eq!(scorer::payout(110, share, 10, 5), 1000);
    assert_eq!(scorer::payout(30, share, 10, 5), -50);
    assert_eq!(scorer::payout(0, share, 10, 5), -500);
}

#[test]
fn test_payout_monotone_in_reduction() {
    let share = 50;
    let mut previous = i64::MIN;
    for reduction in 0..=120 {
        let value = scorer::payout(reduction, share, 20, 5);
        assert!(value >= previous, "payout dropped at reduction {}", reduction);
        previous = value;
    }
}

#[test]
fn test_payout_saturates() {
    assert_eq!(scorer::payout(u64::MAX, u64::MAX, u64::MAX, 0), i64::MAX);
    assert_eq!(scorer::payout(0, u64::MAX, 0, u64::MAX), i64::MIN);
}

#[test]
fn test_tx_record_from_sync_result() {
    let result = TxResult {
        handle: TxHandle::parse("0xabc").unwrap(),
        fee_wei: Some(21_000),
        outcome: TxOutcome::Confirmed {
            confirmed_at: make_time(),
        },
        submitted_at: make_time(),
    };

    let record = TxRecord::from_result(result);
    assert_eq!(record.state, TxState::Confirmed);
    assert_eq!(record.confirmed_at, Some(make_time()));
    assert_eq!(record.error, None);
    assert!(!record.needs_reconcile());
}

#[test]
fn test_tx_record_advances_to_confirmed() {
    let record = make_submitted("0xabc");
    assert!(record.needs_reconcile());

    let check = TxCheck {
        fee_wei: Some(7),
        outcome: TxOutcome::Confirmed {
            confirmed_at: make_time(),
        },
    };
    let advanced = record.advanced(&check).unwrap();

    assert_eq!(advanced.state, TxState::Confirmed);
    assert_eq!(advanced.fee_wei, Some(7));
    assert_eq!(advanced.confirmed_at, Some(make_time()));
    assert_eq!(advanced.submitted_at, record.submitted_at);
    assert!(advanced.advanced(&check).is_none());
}

#[test]
fn test_tx_record_advances_to_failed() {
    let record = make_submitted("0xdef");
    let check = TxCheck {
        fee_wei: None,
        outcome: TxOutcome::Failed {
            error: "reverted".to_string(),
        },
    };

    let advanced = record.advanced(&check).unwrap();
    assert_eq!(advanced.state, TxState::Failed);
    assert_eq!(advanced.error.as_deref(), Some("reverted"));
    assert_eq!(advanced.confirmed_at, None);
}

#[test]
fn test_tx_record_still_submitted_is_unchanged() {
    let record = make_submitted("0x123");
    let check = TxCheck {
        fee_wei: None,
        outcome: TxOutcome::Submitted,
    };
    assert!(record.advanced(&check).is_none());
}

#[test]
fn test_tx_outcome_serialization_is_tagged() {
    let outcome = TxOutcome::Failed {
        error: "out of gas".to_string(),
    };
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value, json!({ "state": "failed", "error": "out of gas" }));

    let record = make_submitted("0x1");
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["state"], "submitted");
    assert!(value.get("confirmed_at").is_none());
    assert!(value.get("fee_wei").is_none());
}
