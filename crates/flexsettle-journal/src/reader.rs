//! Journal reader implementation.

use crate::errors::JournalError;
use crate::frame::{FrameKind, JournalHeader, RecordFrame};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

/// Read mode for handling truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Strict mode: truncated frames are errors.
    Strict,
    /// Permissive mode: truncation is treated as end-of-file.
    Permissive,
}

/// Journal reader for replaying commit frames.
///
/// The reader supports two modes:
/// - [`ReadMode::Strict`] - Truncated frames are errors
/// - [`ReadMode::Permissive`] - Truncation is treated as end-of-file, and the
///   offset of the torn frame is reported by [`JournalReader::torn_tail`]
///
/// # Example
///
/// ```rust,no_run
/// use flexsettle_journal::{JournalReader, ReadMode};
/// use serde_json::Value;
///
/// let mut reader = JournalReader::open("ledger.fsj", ReadMode::Strict)?;
/// while let Some(commit) = reader.read_record::<Value>()? {
///     println!("seq {}", commit["seq"]);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct JournalReader {
    file: File,
    mode: ReadMode,
    position: u64,
    torn_tail: Option<u64>,
}

impl JournalReader {
    /// Opens a journal file for reading.
    ///
    /// The file header is validated and the reader is positioned at the first
    /// record frame after the header.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`](crate::JournalError) if:
    /// - File cannot be opened
    /// - File header is invalid
    /// - I/O error occurs
    pub fn open<P: AsRef<Path>>(path: P, mode: ReadMode) -> Result<Self, JournalError> {
        let mut file = File::open(path)?;
        Self::read_header(&mut file)?;

        Ok(Self {
            file,
            mode,
            position: JournalHeader::HEADER_SIZE as u64,
            torn_tail: None,
        })
    }

    fn read_header(file: &mut File) -> Result<JournalHeader, JournalError> {
        file.seek(io::SeekFrom::Start(0))?;
        let mut header_bytes = [0u8; JournalHeader::HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        JournalHeader::from_bytes(&header_bytes)
    }

    /// Offset just past the last complete frame read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset where an incomplete trailing frame starts, once the reader has
    /// hit one in permissive mode.
    pub fn torn_tail(&self) -> Option<u64> {
        self.torn_tail
    }

    /// Reads the next frame from the journal.
    ///
    /// Returns `Ok(None)` when end-of-file is reached (or truncation in permissive mode).
    pub fn read_frame(&mut self) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        let file_size = self.file.metadata()?.len();
        if self.position >= file_size {
            return Ok(None);
        }
        self.file.seek(io::SeekFrom::Start(self.position))?;

        let frame_start = self.position;
        let mut frame_header_bytes = [0u8; RecordFrame::FRAME_HEADER_SIZE];
        if let Err(e) = self.file.read_exact(&mut frame_header_bytes) {
            return self.on_short_read(e, frame_start);
        }

        let frame = RecordFrame::from_bytes(&frame_header_bytes, frame_start)?;

        let mut payload = vec![0u8; frame.len as usize];
        if let Err(e) = self.file.read_exact(&mut payload) {
            return self.on_short_read(e, frame_start);
        }

        self.position = frame_start + frame.total_len();
        Ok(Some((frame.kind, payload)))
    }

    fn on_short_read(
        &mut self,
        err: io::Error,
        frame_start: u64,
    ) -> Result<Option<(FrameKind, Vec<u8>)>, JournalError> {
        if err.kind() != io::ErrorKind::UnexpectedEof {
            return Err(err.into());
        }
        if self.mode == ReadMode::Permissive {
            self.torn_tail = Some(frame_start);
            return Ok(None);
        }
        Err(JournalError::TruncatedFrame {
            offset: frame_start,
        })
    }

    /// Reads and deserializes the next commit record.
    ///
    /// Skips unknown frame kinds and returns `Ok(None)` at end-of-file.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`](crate::JournalError) if:
    /// - Frame structure is invalid
    /// - The payload is not valid UTF-8 JSON for `T`
    /// - Truncation detected (in strict mode)
    /// - I/O error occurs
    pub fn read_record<T: DeserializeOwned>(&mut self) -> Result<Option<T>, JournalError> {
        loop {
            match self.read_frame()? {
                None => return Ok(None),
                Some((FrameKind::Commit, payload)) => {
                    let text = std::str::from_utf8(&payload)?;
                    return Ok(Some(serde_json::from_str(text)?));
                }
                Some((FrameKind::Unknown(_), _)) => continue,
            }
        }
    }
}
