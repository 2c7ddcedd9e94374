//! Summary, reconciliation and orphan commands.

use flexsettle_canonical::EventId;
use flexsettle_store::TxScope;

use crate::context::GlobalArgs;
use crate::error::CliError;
use crate::output;

pub fn summary(global: &GlobalArgs, event_id: &EventId) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let summary = engine.get_summary(event_id)?;
    output::emit(global.json, &summary, output::print_summary)
}

pub fn reconcile(global: &GlobalArgs, event_id: Option<EventId>) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let scope = match event_id {
        Some(id) => TxScope::Event(id),
        None => TxScope::All,
    };
    let report = engine.reconcile(&scope)?;
    output::emit(global.json, &report, output::print_reconcile)
}

pub fn orphans(global: &GlobalArgs) -> Result<(), CliError> {
    let engine = global.open_engine()?;
    let orphans = engine.list_orphans()?;
    output::emit(global.json, &orphans, |rows| output::print_orphans(rows))
}
