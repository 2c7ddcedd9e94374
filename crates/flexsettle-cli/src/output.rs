//! Output formatting utilities.

use flexsettle_core::{Event, OrphanTx, Proof, Settlement, TxRecord};
use flexsettle_engine::{AuditReport, ProgressSummary, ReconcileReport};
use serde::Serialize;

use crate::error::CliError;

/// Prints `value` as pretty JSON when `json` is set, otherwise runs `human`.
pub fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

/// Engine errors print their envelope; anything else prints a plain line.
pub fn print_error(err: &CliError, json: bool) {
    match err {
        CliError::Engine(engine_err) => {
            let envelope = engine_err.envelope();
            if json {
                let text = serde_json::to_string_pretty(&envelope)
                    .unwrap_or_else(|_| "{}".to_string());
                eprintln!("{}", text);
            } else {
                eprintln!("Error [{}]: {}", envelope.code, envelope.message);
                if envelope.retryable {
                    eprintln!("(retryable)");
                }
            }
        }
        other => eprintln!("Error: {}", other),
    }
}

fn tx_cell(tx: &TxRecord) -> String {
    format!("{} ({})", truncate(tx.handle.as_str(), 18), tx.state.as_str())
}

pub fn print_event(event: &Event) {
    println!("event_id:     {}", event.event_id);
    println!("status:       {}", event.status.as_str());
    println!("window:       {} .. {}", event.start_time, event.end_time);
    println!("target_kw:    {}", event.target_kw);
    println!("reward_rate:  {}", event.reward_rate);
    println!("penalty_rate: {}", event.penalty_rate);
    println!("create_tx:    {}", tx_cell(&event.create_tx));
    if let Some(tx) = &event.close_tx {
        println!("close_tx:     {}", tx_cell(tx));
    }
}

pub fn print_proof(proof: &Proof) {
    println!("event_id:      {}", proof.event_id);
    println!("site_id:       {}", proof.site_id);
    println!("baseline_kwh:  {}", proof.baseline_kwh);
    println!("actual_kwh:    {}", proof.actual_kwh);
    println!("reduction_kwh: {}", proof.reduction_kwh);
    println!("method:        {}", proof.baseline_method);
    println!("uri:           {}", proof.uri);
    println!("proof_hash:    {}", proof.proof_hash);
    println!("submitter:     {}", proof.submitter);
    println!("submit_tx:     {}", tx_cell(&proof.submit_tx));
}

/// Prints settlements as a table.
#[allow(clippy::print_literal)]
pub fn print_settlements(settlements: &[Settlement]) {
    println!(
        "{:<16} {:>12} {:<8} {:<32} {}",
        "SITE", "PAYOUT", "STATUS", "SETTLE_TX", "CLAIM_TX"
    );
    println!("{}", "-".repeat(100));
    for row in settlements {
        println!(
            "{:<16} {:>12} {:<8} {:<32} {}",
            truncate(row.site_id.as_str(), 16),
            row.payout,
            row.status.as_str(),
            tx_cell(&row.settle_tx),
            row.claim_tx.as_ref().map(tx_cell).unwrap_or_else(|| "-".to_string())
        );
    }
}

pub fn print_audit(report: &AuditReport) {
    println!("event_id:   {}", report.event_id);
    println!("site_id:    {}", report.site_id);
    println!("stored:     {}", report.stored_hash);
    println!("recomputed: {}", report.recomputed_hash);
    println!("matches:    {}", report.matches);
    println!("raw_uri:    {}", report.raw_uri);
}

pub fn print_summary(summary: &ProgressSummary) {
    println!("event_id:    {} ({})", summary.event_id, summary.event_status.as_str());
    println!(
        "progress:    {}/{} ({}%) step={}",
        summary.progress_completed,
        summary.progress_total,
        summary.progress_pct,
        summary.current_step.as_str()
    );
    println!("blocking:    {}", summary.blocking_reason);
    println!("hint:        {}", summary.agent_hint);
    println!(
        "proofs:      {}/{} ({} kWh)",
        summary.proof_submitted, summary.proof_required, summary.total_reduction_kwh
    );
    println!("payout:      {}", summary.total_payout);
    println!(
        "tx:          {} total, {} submitted, {} confirmed, {} failed",
        summary.tx_pipeline.total,
        summary.tx_pipeline.submitted,
        summary.tx_pipeline.confirmed,
        summary.tx_pipeline.failed
    );
}

pub fn print_reconcile(report: &ReconcileReport) {
    println!(
        "pending={} checks={} updated={}",
        report.pending, report.checks, report.updated
    );
}

/// Prints orphaned ledger actions as a table.
#[allow(clippy::print_literal)]
pub fn print_orphans(orphans: &[OrphanTx]) {
    println!(
        "{:<14} {:<16} {:<12} {:<32} {}",
        "ACTION", "EVENT", "SITE", "TX", "REASON"
    );
    println!("{}", "-".repeat(100));
    for orphan in orphans {
        println!(
            "{:<14} {:<16} {:<12} {:<32} {}",
            orphan.action.as_str(),
            truncate(orphan.event_id.as_str(), 16),
            orphan.site_id.as_ref().map(|s| s.as_str()).unwrap_or("-"),
            tx_cell(&orphan.tx),
            orphan.reason
        );
    }
}

/// Prints the journal table header.
#[allow(clippy::print_literal)]
pub fn print_journal_header() {
    println!("{:>8} {:<18} {}", "SEQ", "OP", "EVENT");
    println!("{}", "-".repeat(60));
}

pub fn format_journal_row(seq: u64, op: &str, event: &str) -> String {
    format!("{:>8} {:<18} {}", seq, op, event)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
