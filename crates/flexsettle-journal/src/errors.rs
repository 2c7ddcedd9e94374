use thiserror::Error;

/// Errors that can occur during journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid file header (magic, version, or flags).
    #[error("invalid journal header: {0}")]
    InvalidHeader(String),
    /// Invalid frame structure (kind, reserved bytes, or length).
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Byte offset where the frame starts.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// Payload exceeds maximum size limit.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: u64,
        /// Maximum allowed size.
        max: u32,
    },
    /// Invalid UTF-8 in a commit payload.
    #[error("invalid UTF-8 in commit payload: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// Commit payload is not valid JSON for the expected record type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Existing file is shorter than a header.
    #[error("file is not empty; cannot initialize header")]
    FileNotEmpty,
    /// Truncated frame detected in strict mode.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Byte offset where truncation occurred.
        offset: u64,
    },
    /// Rollback target lies outside the frame area.
    #[error("cannot truncate journal to {target}: valid range is {min}..={max}")]
    InvalidTruncate {
        /// Requested length.
        target: u64,
        /// Header length.
        min: u64,
        /// Current length.
        max: u64,
    },
}
