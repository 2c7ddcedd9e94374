//! Event commands.

use flexsettle_canonical::EventId;
use flexsettle_engine::NewEvent;

use crate::context::GlobalArgs;
use crate::error::CliError;
use crate::output;

pub fn create(global: &GlobalArgs, request: NewEvent) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let event = engine.create_event(request)?;
    output::emit(global.json, &event, output::print_event)
}

pub fn close(global: &GlobalArgs, event_id: &EventId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let event = engine.close_event(event_id)?;
    output::emit(global.json, &event, output::print_event)
}

pub fn show(global: &GlobalArgs, event_id: &EventId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let event = engine.get_event(event_id)?;
    output::emit(global.json, &event, output::print_event)
}
