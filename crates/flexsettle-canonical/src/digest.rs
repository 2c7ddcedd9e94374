use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

use crate::validation::ValidationError;

static PROOF_HASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)sha256:[0-9a-f]{64}$").expect("invalid regex"));

/// Supported content hash schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashScheme {
    /// SHA-256 (the current FlexSettle default).
    Sha256,
}

impl HashScheme {
    /// Prefix written in front of the hex digest.
    pub fn prefix(self) -> &'static str {
        match self {
            HashScheme::Sha256 => "sha256:",
        }
    }
}

/// Scheme-prefixed, lowercase hex content hash (e.g. `sha256:9f86…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofHash {
    scheme: HashScheme,
    hex: String,
}

impl ProofHash {
    /// Hashes `bytes` with SHA-256.
    pub fn sha256(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self {
            scheme: HashScheme::Sha256,
            hex: hex::encode(digest),
        }
    }

    /// Parses a prefixed hash; hex digits are accepted in either case and
    /// normalized to lowercase.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !PROOF_HASH_PATTERN.is_match(&s) {
            return Err(ValidationError::PatternMismatch {
                field: "proof_hash",
                value: s,
            });
        }
        let hex = s[HashScheme::Sha256.prefix().len()..].to_ascii_lowercase();
        Ok(Self {
            scheme: HashScheme::Sha256,
            hex,
        })
    }

    /// Hash scheme.
    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Lowercase hex digest without the scheme prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme.prefix(), self.hex)
    }
}

impl TryFrom<String> for ProofHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProofHash> for String {
    fn from(value: ProofHash) -> Self {
        value.to_string()
    }
}
