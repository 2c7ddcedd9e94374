use flexsettle_canonical::{SiteId, TxHandle};
use flexsettle_core::{
    ConfirmMode, CoreError, EngineConfig, LedgerAction, LedgerAdapter, SimulatedLedger, TxOutcome,
    TxState,
};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_simulated_sync_confirms_immediately() {
    let ledger = SimulatedLedger::default();
    let result = ledger
        .submit(LedgerAction::CreateEvent, &json!({ "event_id": "evt-1" }), ConfirmMode::Sync)
        .unwrap();

    assert_eq!(result.outcome.state(), TxState::Confirmed);
    assert_eq!(result.fee_wei, Some(0));
    assert!(result.handle.as_str().starts_with("0x"));
    assert_eq!(result.handle.as_str().len(), 66);
}

#[test]
fn test_simulated_hybrid_confirms_after_checks() {
    let ledger = SimulatedLedger::new(2);
    let result = ledger
        .submit(LedgerAction::SubmitProof, &json!({}), ConfirmMode::Hybrid)
        .unwrap();
    assert_eq!(result.outcome, TxOutcome::Submitted);
    assert_eq!(result.fee_wei, None);

    let first = ledger.check(&result.handle).unwrap();
    assert_eq!(first.outcome, TxOutcome::Submitted);

    let second = ledger.check(&result.handle).unwrap();
    assert_eq!(second.outcome.state(), TxState::Confirmed);
    assert_eq!(second.fee_wei, Some(0));

    // terminal handles restate their status
    let third = ledger.check(&result.handle).unwrap();
    assert_eq!(third.outcome.state(), TxState::Confirmed);
}

#[test]
fn test_simulated_handles_are_unique() {
    let ledger = SimulatedLedger::default();
    let payload = json!({ "event_id": "evt-1" });
    let a = ledger.submit(LedgerAction::CloseEvent, &payload, ConfirmMode::Sync).unwrap();
    let b = ledger.submit(LedgerAction::CloseEvent, &payload, ConfirmMode::Sync).unwrap();
    assert_ne!(a.handle, b.handle);
}

#[test]
fn test_simulated_unknown_handle_is_confirmed() {
    let ledger = SimulatedLedger::default();
    let check = ledger.check(&TxHandle::parse("0xfeed").unwrap()).unwrap();
    assert_eq!(check.outcome.state(), TxState::Confirmed);
}

#[test]
fn test_arc_adapter_delegates() {
    let ledger = Arc::new(SimulatedLedger::new(0));
    let shared: Arc<dyn LedgerAdapter> = ledger.clone();
    let result = shared
        .submit(LedgerAction::ClaimReward, &json!({}), ConfirmMode::Hybrid)
        .unwrap();
    assert_eq!(result.outcome.state(), TxState::Confirmed);
}

#[test]
fn test_ledger_action_names() {
    assert_eq!(LedgerAction::SettleEvent.as_str(), "settle_event");
    assert_eq!(
        serde_json::to_value(LedgerAction::ClaimReward).unwrap(),
        json!("claim_reward")
    );
}

#[test]
fn test_config_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.confirm_mode(), ConfirmMode::Hybrid);
    assert_eq!(config.focus_site().as_str(), "site-a");
    assert_eq!(config.required_sites().len(), 2);
}

#[test]
fn test_config_dedupes_sites() {
    let sites = EngineConfig::parse_sites("site-b, site-a,site-b,,").unwrap();
    let config = EngineConfig::new(sites, ConfirmMode::Sync).unwrap();
    let names: Vec<&str> = config.required_sites().iter().map(SiteId::as_str).collect();
    assert_eq!(names, vec!["site-b", "site-a"]);
    assert_eq!(config.focus_site().as_str(), "site-b");
}

#[test]
fn test_config_rejects_empty_sites() {
    match EngineConfig::new(Vec::new(), ConfirmMode::Sync) {
        Err(CoreError::Validation(_)) => {}
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert!(EngineConfig::from_json(r#"{"required_sites":[]}"#).is_err());
}

#[test]
fn test_config_from_json() {
    let config =
        EngineConfig::from_json(r#"{"required_sites":["north-1","south-2"],"confirm_mode":"sync"}"#)
            .unwrap();
    assert_eq!(config.confirm_mode(), ConfirmMode::Sync);
    assert_eq!(config.focus_site().as_str(), "north-1");

    let defaulted = EngineConfig::from_json(r#"{"required_sites":["north-1"]}"#).unwrap();
    assert_eq!(defaulted.confirm_mode(), ConfirmMode::Hybrid);

    assert!(EngineConfig::from_json(r#"{"required_sites":["bad site"]}"#).is_err());
}

#[test]
fn test_confirm_mode_parse() {
    assert_eq!("SYNC".parse::<ConfirmMode>().unwrap(), ConfirmMode::Sync);
    assert_eq!("hybrid".parse::<ConfirmMode>().unwrap(), ConfirmMode::Hybrid);
    assert!("async".parse::<ConfirmMode>().is_err());
}
