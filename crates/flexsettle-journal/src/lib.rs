//! Append-only commit journal for the FlexSettle ledger index.
//!
//! This crate provides:
//! - Framed, append-only storage for JSON commit records
//! - Reader/writer APIs with strict and permissive modes
//! - Torn-tail detection and rollback for crash recovery
//!
//! ## Layout
//!
//! A journal starts with a 16-byte header (`FSJ1`, version, flags, reserved),
//! followed by frames of an 8-byte header (kind, reserved, little-endian
//! length) and a UTF-8 JSON payload. The store writes one `Commit` frame per
//! atomic mutation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flexsettle_journal::{JournalReader, JournalWriter, ReadMode, WriteOptions};
//! use serde_json::{json, Value};
//!
//! let mut writer = JournalWriter::open("ledger.fsj", WriteOptions::default())?;
//! writer.append_record(&json!({ "seq": 1, "mutation": { "record_orphan": {} } }))?;
//! writer.finish()?;
//!
//! let mut reader = JournalReader::open("ledger.fsj", ReadMode::Permissive)?;
//! while let Some(commit) = reader.read_record::<Value>()? {
//!     println!("seq {}", commit["seq"]);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Error types for journal operations.
pub mod errors;
/// Frame structure and serialization.
pub mod frame;
/// Journal reader implementation.
pub mod reader;
/// Journal writer implementation.
pub mod writer;

pub use errors::JournalError;
pub use frame::{FrameKind, JournalHeader, RecordFrame};
pub use reader::{JournalReader, ReadMode};
pub use writer::{JournalWriter, WriteOptions};
