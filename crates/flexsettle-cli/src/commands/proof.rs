//! Proof and audit commands.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_engine::ProofSubmission;

use crate::context::GlobalArgs;
use crate::error::CliError;
use crate::output;

pub fn submit(global: &GlobalArgs, submission: ProofSubmission) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let proof = engine.submit_proof(submission)?;
    output::emit(global.json, &proof, output::print_proof)
}

pub fn show(global: &GlobalArgs, event_id: &EventId, site_id: &SiteId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let proof = engine.get_proof(event_id, site_id)?;
    output::emit(global.json, &proof, output::print_proof)
}

pub fn audit(global: &GlobalArgs, event_id: &EventId, site_id: &SiteId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let report = engine.get_audit(event_id, site_id)?;
    output::emit(global.json, &report, output::print_audit)
}
