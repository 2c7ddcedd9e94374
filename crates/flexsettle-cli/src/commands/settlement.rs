//! Settlement and claim commands.

use flexsettle_canonical::{ActorId, EventId, SiteId};

use crate::context::GlobalArgs;
use crate::error::CliError;
use crate::output;

pub fn settle(global: &GlobalArgs, event_id: &EventId, sites: &[SiteId]) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let settlements = engine.settle_event(event_id, sites)?;
    output::emit(global.json, &settlements, |rows| output::print_settlements(rows))
}

pub fn claim(
    global: &GlobalArgs,
    event_id: &EventId,
    site_id: &SiteId,
    actor: &ActorId,
) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let settlement = engine.claim_reward(event_id, site_id, actor)?;
    output::emit(global.json, &settlement, |row| {
        output::print_settlements(std::slice::from_ref(row))
    })
}

pub fn list(global: &GlobalArgs, event_id: &EventId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let settlements = engine.list_settlements(event_id)?;
    output::emit(global.json, &settlements, |rows| output::print_settlements(rows))
}
