//! Canonical data primitives for FlexSettle proofs and ledger records.
//!
//! Every value that participates in proof hashing lives in this crate:
//! the RFC 8785 canonicalizer, the scheme-prefixed content hash, and the
//! validated identifier newtypes used as composite keys by the store.
//!
#![deny(missing_docs)]

/// Canonicalization helpers for deterministic hashing.
pub mod canonicalizer;
/// Content hash primitives.
pub mod digest;
/// Identifier newtypes (events, sites, actors, ledger handles).
pub mod identifiers;
/// Validation helpers used by canonical types.
pub mod validation;

pub use canonicalizer::{CanonicalizationError, Canonicalizer};
pub use digest::{HashScheme, ProofHash};
pub use identifiers::{ActorId, EventId, MethodTag, SiteId, TxHandle};
pub use validation::ValidationError;
