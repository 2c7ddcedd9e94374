//! Journal writer implementation.

use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

/// Options for journal writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether to fsync after each append (default: false).
    pub sync: bool,
    /// Whether to create the file if it doesn't exist (default: true).
    pub create: bool,
    /// Whether to append to an existing file (default: true).
    pub append: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            create: true,
            append: true,
        }
    }
}

/// Append-only writer for commit frames.
///
/// Each append writes exactly one frame. A failed append rolls the file back
/// to its previous length, so a reader never observes a partial frame that a
/// live writer produced.
///
/// # Example
///
/// ```rust,no_run
/// use flexsettle_journal::{JournalWriter, WriteOptions};
/// use serde_json::json;
///
/// let mut writer = JournalWriter::open("ledger.fsj", WriteOptions::default())?;
/// writer.append_record(&json!({ "seq": 1, "mutation": { "record_orphan": {} } }))?;
/// writer.finish()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct JournalWriter {
    file: File,
    sync: bool,
    len: u64,
}

impl JournalWriter {
    /// Opens or creates a journal file for writing.
    ///
    /// If the file is empty a header is written. If the file exists, its header
    /// is validated and the writer is positioned for appending (if
    /// `options.append` is `true`) or the frame area is cleared (if `false`).
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`](crate::JournalError) if:
    /// - File cannot be opened/created
    /// - Existing file is not a valid journal
    /// - File is not empty but too small to be valid
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self, JournalError> {
        let file = OpenOptions::new()
            .create(options.create)
            .write(true)
            .read(true)
            .open(path)?;

        let mut writer = Self {
            file,
            sync: options.sync,
            len: 0,
        };

        let existing = writer.file.metadata()?.len();
        if existing == 0 {
            writer.write_header()?;
        } else if existing < JournalHeader::HEADER_SIZE as u64 {
            return Err(JournalError::FileNotEmpty);
        } else {
            let mut header_bytes = [0u8; JournalHeader::HEADER_SIZE];
            writer.file.seek(io::SeekFrom::Start(0))?;
            writer.file.read_exact(&mut header_bytes)?;
            JournalHeader::from_bytes(&header_bytes)?;
            writer.len = existing;
            if !options.append {
                writer.truncate(JournalHeader::HEADER_SIZE as u64)?;
            }
            writer.file.seek(io::SeekFrom::Start(writer.len))?;
        }

        Ok(writer)
    }

    fn write_header(&mut self) -> Result<(), JournalError> {
        let bytes = JournalHeader::new().to_bytes();
        self.file.seek(io::SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        self.len = bytes.len() as u64;
        Ok(())
    }

    /// Current file length in bytes, header included.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the journal holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len <= JournalHeader::HEADER_SIZE as u64
    }

    /// Serializes `record` as JSON and appends it as a `Commit` frame.
    ///
    /// Returns the offset at which the frame starts.
    pub fn append_record<T: Serialize>(&mut self, record: &T) -> Result<u64, JournalError> {
        let json_bytes = serde_json::to_vec(record)?;
        self.append_raw(FrameKind::Commit, &json_bytes)
    }

    /// Appends a raw frame with the given kind and payload.
    ///
    /// Returns the offset at which the frame starts.
    pub fn append_raw(&mut self, kind: FrameKind, payload: &[u8]) -> Result<u64, JournalError> {
        let bytes = RecordFrame::encode(kind, payload)?;
        let start = self.len;

        if let Err(e) = self.write_frame(&bytes) {
            // Leave no partial frame behind; the original error wins.
            let _ = self.truncate(start);
            return Err(e);
        }

        self.len = start + bytes.len() as u64;
        Ok(start)
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), JournalError> {
        self.file.seek(io::SeekFrom::Start(self.len))?;
        self.file.write_all(bytes)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Cuts the journal back to `len` bytes. Used to drop a torn trailing
    /// frame left by a crash.
    pub fn truncate(&mut self, len: u64) -> Result<(), JournalError> {
        let min = JournalHeader::HEADER_SIZE as u64;
        let max = self.file.metadata()?.len();
        if len < min || len > max {
            return Err(JournalError::InvalidTruncate {
                target: len,
                min,
                max,
            });
        }
        self.file.set_len(len)?;
        self.file.seek(io::SeekFrom::Start(len))?;
        if self.sync {
            self.file.sync_all()?;
        }
        self.len = len;
        Ok(())
    }

    /// Finishes writing and closes the file.
    pub fn finish(mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
        if self.sync {
            let _ = self.file.sync_all();
        }
    }
}
