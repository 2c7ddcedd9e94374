//! On-disk layout of a commit journal.
//!
//! ```text
//! header  : "FSJ1" | version u16 LE | 10 zero bytes
//! frame   : kind u8 | 3 zero bytes | len u32 LE | payload[len]
//! ```
//!
//! Every integer is little-endian. The only frame a store writes is
//! [`FrameKind::Commit`]; readers skip other kinds.

use crate::errors::JournalError;

/// Journal file magic bytes.
pub const MAGIC: &[u8; 4] = b"FSJ1";

/// Current journal format version.
pub const VERSION: u16 = 0x0001;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 16;

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload one frame may carry: 16 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Byte tag of a commit frame.
pub const FRAME_KIND_COMMIT: u8 = 0x01;

/// Journal file header.
///
/// Only the version varies; magic and the zeroed tail are checked on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// Format version.
    pub version: u16,
}

impl JournalHeader {
    /// Header size constant.
    pub const HEADER_SIZE: usize = HEADER_SIZE;

    /// Header for the current format version.
    pub fn new() -> Self {
        Self { version: VERSION }
    }

    /// Encodes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes
    }

    /// Decodes a header. Other format versions are rejected; there is no
    /// in-place migration.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, JournalError> {
        let invalid = |reason: String| Err(JournalError::InvalidHeader(reason));
        let Some(bytes) = bytes.get(..HEADER_SIZE) else {
            return invalid(format!("header too short: {} bytes", bytes.len()));
        };
        if &bytes[..4] != MAGIC {
            return invalid(format!("invalid magic: {:?}", &bytes[..4]));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return invalid(format!(
                "unsupported version: 0x{:04x}, expected 0x{:04x}",
                version, VERSION
            ));
        }
        if let Some(pos) = bytes[6..].iter().position(|b| *b != 0) {
            return invalid(format!("non-zero reserved byte at {}", pos + 6));
        }
        Ok(Self { version })
    }
}

impl Default for JournalHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 JSON object holding one atomic store mutation.
    Commit,
    /// Tag this version does not understand; skipped on read.
    Unknown(u8),
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            FRAME_KIND_COMMIT => FrameKind::Commit,
            other => FrameKind::Unknown(other),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Commit => FRAME_KIND_COMMIT,
            FrameKind::Unknown(byte) => byte,
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFrame {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length in bytes.
    pub len: u32,
}

impl RecordFrame {
    /// Frame header size constant.
    pub const FRAME_HEADER_SIZE: usize = FRAME_HEADER_SIZE;

    /// Frame header for a payload of `len` bytes.
    pub fn new(kind: FrameKind, len: usize) -> Result<Self, JournalError> {
        match u32::try_from(len) {
            Ok(len) if len <= MAX_PAYLOAD_SIZE => Ok(Self { kind, len }),
            _ => Err(JournalError::PayloadTooLarge {
                size: len as u64,
                max: MAX_PAYLOAD_SIZE,
            }),
        }
    }

    /// Header plus payload, ready to append in a single write.
    pub fn encode(kind: FrameKind, payload: &[u8]) -> Result<Vec<u8>, JournalError> {
        let frame = Self::new(kind, payload.len())?;
        let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&frame.to_bytes());
        bytes.extend_from_slice(payload);
        Ok(bytes)
    }

    /// On-disk size of the frame, header included.
    pub fn total_len(&self) -> u64 {
        FRAME_HEADER_SIZE as u64 + u64::from(self.len)
    }

    /// Encodes the frame header.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.into();
        bytes[4..].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Decodes the header of the frame starting at journal `offset`.
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self, JournalError> {
        let invalid = |reason: String| Err(JournalError::InvalidFrame { offset, reason });
        let Some(bytes) = bytes.get(..FRAME_HEADER_SIZE) else {
            return invalid(format!("frame header too short: {} bytes", bytes.len()));
        };
        if bytes[1..4] != [0u8; 3] {
            return invalid("non-zero reserved bytes".to_string());
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return invalid(format!(
                "payload size {} exceeds maximum {}",
                len, MAX_PAYLOAD_SIZE
            ));
        }
        Ok(Self {
            kind: FrameKind::from(bytes[0]),
            len,
        })
    }
}
