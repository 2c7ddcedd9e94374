use chrono::{DateTime, SecondsFormat, Utc};
use flexsettle_canonical::{Canonicalizer, EventId, MethodTag, ProofHash, SiteId};
use serde_json::{json, Map, Value};

use crate::errors::CodecError;

/// Business fields of a proof before canonicalization.
#[derive(Debug, Clone)]
pub struct ProofInput<'a> {
    /// Owning event.
    pub event_id: &'a EventId,
    /// Reporting site.
    pub site_id: &'a SiteId,
    /// Counterfactual consumption in kWh.
    pub baseline_kwh: u64,
    /// Metered consumption in kWh.
    pub actual_kwh: u64,
    /// Baseline method tag.
    pub method: &'a MethodTag,
    /// Caller-supplied raw evidence; `None` canonicalizes as `{}`.
    pub raw_payload: Option<&'a Value>,
    /// Creation instant embedded in the payload.
    pub created_at: DateTime<Utc>,
}

/// Canonical proof payload plus its derived fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalProof {
    /// Canonical JSON text; this exact string is persisted and re-hashed on audit.
    pub payload: String,
    /// `max(baseline - actual, 0)`.
    pub reduction_kwh: u64,
    /// Content hash of `payload`.
    pub proof_hash: ProofHash,
}

/// `max(baseline - actual, 0)`; never negative.
pub fn reduction_kwh(baseline_kwh: u64, actual_kwh: u64) -> u64 {
    baseline_kwh.saturating_sub(actual_kwh)
}

/// Builds the canonical payload for a proof and hashes it.
///
/// The payload object carries every business field plus the derived
/// `reduction_kwh`; keys are emitted in RFC 8785 order so the bytes do not
/// depend on how the caller built `raw_payload`.
pub fn canonicalize(
    input: &ProofInput<'_>,
    canonicalizer: &Canonicalizer,
) -> Result<CanonicalProof, CodecError> {
    let raw_payload = match input.raw_payload {
        None => Value::Object(Map::new()),
        Some(value @ Value::Object(_)) => value.clone(),
        Some(other) => return Err(CodecError::RawPayloadNotObject(json_kind(other))),
    };

    let reduction = reduction_kwh(input.baseline_kwh, input.actual_kwh);
    let value = json!({
        "event_id": input.event_id,
        "site_id": input.site_id,
        "baseline_kwh": input.baseline_kwh,
        "actual_kwh": input.actual_kwh,
        "reduction_kwh": reduction,
        "baseline_method": input.method,
        "raw_payload": raw_payload,
        "created_at": input.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    });

    let bytes = canonicalizer.canonicalize(&value)?;
    let proof_hash = hash(&bytes);
    let payload = String::from_utf8(bytes)?;

    Ok(CanonicalProof {
        payload,
        reduction_kwh: reduction,
        proof_hash,
    })
}

/// Content hash of canonical bytes.
pub fn hash(canonical_bytes: &[u8]) -> ProofHash {
    ProofHash::sha256(canonical_bytes)
}

/// Recomputes the hash of a stored canonical payload. Audits use this and
/// never trust the stored hash.
pub fn recompute(payload: &str) -> ProofHash {
    hash(payload.as_bytes())
}

/// Compares a caller-declared hash with the computed one. Unparsable
/// declarations never match.
pub fn declared_hash_matches(declared: &str, computed: &ProofHash) -> bool {
    match ProofHash::parse(declared.trim()) {
        Ok(parsed) => &parsed == computed,
        Err(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
