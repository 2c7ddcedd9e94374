//! Journal-backed store.

use flexsettle_canonical::{EventId, SiteId};
use flexsettle_core::{AuditRequest, Event, OrphanTx, Proof, Settlement};
use flexsettle_journal::frame::MAX_PAYLOAD_SIZE;
use flexsettle_journal::{JournalReader, JournalWriter, ReadMode, WriteOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::mutation::{Mutation, PendingTx, TxScope};
use crate::tables::Tables;
use crate::traits::LedgerIndexStore;

/// Bytes of a commit frame payload taken by `{"seq":..,"mutation":..}`.
const COMMIT_ENVELOPE_BYTES: usize = 64;

/// Payload of one `Commit` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// 1-based commit sequence number, contiguous within a journal.
    pub seq: u64,
    /// The mutation committed.
    pub mutation: Mutation,
}

#[derive(Serialize)]
struct CommitRef<'a> {
    seq: u64,
    mutation: &'a Mutation,
}

struct Inner {
    tables: Tables,
    writer: JournalWriter,
    seq: u64,
}

/// Store whose every commit is one frame in a `flexsettle-journal` file.
///
/// Opening replays the journal into memory. A torn trailing frame from a
/// crash is cut away; any other damage fails the open.
pub struct JournalStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JournalStore {
    /// Opens (or creates) the journal at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with(path, WriteOptions::default())
    }

    /// Opens (or creates) the journal at `path`.
    pub fn open_with<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut tables = Tables::default();
        let mut seq = 0u64;
        let mut torn_tail = None;

        let has_frames = options.append
            && std::fs::metadata(&path)
                .map(|m| m.len() > 0)
                .unwrap_or(false);
        if has_frames {
            let mut reader = JournalReader::open(&path, ReadMode::Permissive)?;
            while let Some(record) = reader.read_record::<CommitRecord>()? {
                if record.seq != seq + 1 {
                    return Err(StoreError::Replay {
                        seq: record.seq,
                        reason: format!("expected sequence {}", seq + 1),
                    });
                }
                tables
                    .check(&record.mutation)
                    .map_err(|e| StoreError::Replay {
                        seq: record.seq,
                        reason: e.to_string(),
                    })?;
                tables.apply(record.mutation);
                seq = record.seq;
            }
            torn_tail = reader.torn_tail();
        }

        let mut writer = JournalWriter::open(&path, options)?;
        if let Some(offset) = torn_tail {
            tracing::warn!(
                path = %path.display(),
                offset,
                dropped_bytes = writer.len().saturating_sub(offset),
                "truncating torn journal tail"
            );
            writer.truncate(offset)?;
        }

        tracing::info!(path = %path.display(), commits = seq, "ledger index journal opened");
        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                tables,
                writer,
                seq,
            }),
        })
    }

    /// Path of the backing journal.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of commits in the journal.
    pub fn commit_count(&self) -> Result<u64, StoreError> {
        Ok(self.inner()?.seq)
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    fn tables(&self) -> Result<TablesGuard<'_>, StoreError> {
        Ok(TablesGuard(self.inner()?))
    }
}

struct TablesGuard<'a>(MutexGuard<'a, Inner>);

impl std::ops::Deref for TablesGuard<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.0.tables
    }
}

impl LedgerIndexStore for JournalStore {
    fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        let mut inner = self.inner()?;
        inner.tables.check(&mutation)?;

        let seq = inner.seq + 1;
        inner.writer.append_record(&CommitRef {
            seq,
            mutation: &mutation,
        })?;
        inner.seq = seq;

        tracing::debug!(seq, op = mutation.op(), "commit appended");
        inner.tables.apply(mutation);
        Ok(())
    }

    fn max_commit_bytes(&self) -> Option<usize> {
        Some(MAX_PAYLOAD_SIZE as usize - COMMIT_ENVELOPE_BYTES)
    }

    fn get_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.tables()?.event(event_id).cloned())
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.tables()?.events().cloned().collect())
    }

    fn get_proof(&self, event_id: &EventId, site_id: &SiteId) -> Result<Option<Proof>, StoreError> {
        Ok(self.tables()?.proof(event_id, site_id).cloned())
    }

    fn list_proofs(&self, event_id: &EventId) -> Result<Vec<Proof>, StoreError> {
        Ok(self.tables()?.proofs_for(event_id).cloned().collect())
    }

    fn get_settlement(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<Settlement>, StoreError> {
        Ok(self.tables()?.settlement(event_id, site_id).cloned())
    }

    fn list_settlements(&self, event_id: &EventId) -> Result<Vec<Settlement>, StoreError> {
        Ok(self.tables()?.settlements_for(event_id).cloned().collect())
    }

    fn get_audit(
        &self,
        event_id: &EventId,
        site_id: &SiteId,
    ) -> Result<Option<AuditRequest>, StoreError> {
        Ok(self.tables()?.audit(event_id, site_id).cloned())
    }

    fn pending_transactions(&self, scope: &TxScope) -> Result<Vec<PendingTx>, StoreError> {
        Ok(self.tables()?.pending(scope))
    }

    fn list_orphans(&self) -> Result<Vec<OrphanTx>, StoreError> {
        Ok(self.tables()?.orphans().to_vec())
    }
}
