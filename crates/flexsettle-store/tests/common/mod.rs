#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use flexsettle_canonical::{ActorId, EventId, MethodTag, ProofHash, SiteId, TxHandle};
use flexsettle_core::{
    Event, EventStatus, Proof, Settlement, SettlementStatus, TxRecord, TxState,
};

pub fn make_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 17, 10, 0, 0).unwrap()
}

pub fn event_id(id: &str) -> EventId {
    EventId::parse(id).unwrap()
}

pub fn site(id: &str) -> SiteId {
    SiteId::parse(id).unwrap()
}

pub fn make_tx(handle: &str, state: TxState) -> TxRecord {
    TxRecord {
        handle: TxHandle::parse(handle).unwrap(),
        fee_wei: match state {
            TxState::Submitted => None,
            _ => Some(0),
        },
        state,
        submitted_at: make_time(),
        confirmed_at: match state {
            TxState::Confirmed => Some(make_time()),
            _ => None,
        },
        error: None,
    }
}

pub fn make_event(id: &str, create_tx: TxRecord) -> Event {
    Event {
        event_id: event_id(id),
        start_time: make_time(),
        end_time: make_time() + chrono::Duration::hours(2),
        target_kw: 200,
        reward_rate: 10,
        penalty_rate: 5,
        status: EventStatus::Active,
        create_tx,
        close_tx: None,
        created_at: make_time(),
        closed_at: None,
        settled_at: None,
    }
}

pub fn make_proof(event: &str, site_id: &str, submit_tx: TxRecord) -> Proof {
    let payload = format!(r#"{{"event_id":"{}","site_id":"{}"}}"#, event, site_id);
    Proof {
        event_id: event_id(event),
        site_id: site(site_id),
        baseline_kwh: 150,
        actual_kwh: 40,
        reduction_kwh: 110,
        baseline_method: MethodTag::parse("simple").unwrap(),
        uri: format!("s3://meters/{}/{}.csv", event, site_id),
        proof_hash: ProofHash::sha256(payload.as_bytes()),
        payload,
        submit_tx,
        submitter: ActorId::parse("operator@site").unwrap(),
        submitted_at: make_time(),
    }
}

pub fn make_settlement(event: &str, site_id: &str, settle_tx: TxRecord) -> Settlement {
    Settlement {
        event_id: event_id(event),
        site_id: site(site_id),
        payout: 1000,
        status: SettlementStatus::Settled,
        settle_tx,
        claim_tx: None,
        settled_at: make_time(),
        claimed_at: None,
    }
}
