//! Journal listing command.

use flexsettle_journal::{JournalReader, ReadMode};
use flexsettle_store::{CommitRecord, Mutation};

use crate::context::GlobalArgs;
use crate::error::CliError;
use crate::output;

pub fn run(global: &GlobalArgs, max_commits: Option<u64>) -> Result<(), CliError> {
    let mut reader = JournalReader::open(&global.journal, ReadMode::Strict)?;

    if !global.json {
        output::print_journal_header();
    }

    let mut count: u64 = 0;
    while let Some(record) = reader.read_record::<CommitRecord>()? {
        if max_commits.is_some_and(|max| count >= max) {
            break;
        }

        if global.json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!(
                "{}",
                output::format_journal_row(record.seq, record.mutation.op(), &scope(&record.mutation))
            );
        }
        count += 1;
    }

    Ok(())
}

fn scope(mutation: &Mutation) -> String {
    match mutation {
        Mutation::InsertEvent { event } => event.event_id.to_string(),
        Mutation::CloseEvent { event_id, .. } | Mutation::SettleEvent { event_id, .. } => {
            event_id.to_string()
        }
        Mutation::InsertProof { proof } => format!("{}/{}", proof.event_id, proof.site_id),
        Mutation::ClaimSettlement {
            event_id, site_id, ..
        } => format!("{}/{}", event_id, site_id),
        Mutation::UpsertAudit { request } => format!("{}/{}", request.event_id, request.site_id),
        Mutation::ApplyTxUpdates { updates } => format!("{} update(s)", updates.len()),
        Mutation::RecordOrphan { orphan } => orphan.event_id.to_string(),
    }
}
