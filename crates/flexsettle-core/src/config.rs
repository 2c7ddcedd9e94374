use flexsettle_canonical::{SiteId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// How the engine expects the ledger to confirm submitted actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmMode {
    /// `submit` waits for confirmation and returns a terminal state.
    Sync,
    /// `submit` may return `submitted`; reconciliation discovers the outcome.
    #[default]
    Hybrid,
}

impl ConfirmMode {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfirmMode::Sync => "sync",
            ConfirmMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ConfirmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(ConfirmMode::Sync),
            "hybrid" => Ok(ConfirmMode::Hybrid),
            other => Err(CoreError::Config(format!(
                "confirm mode '{}' is not one of: sync, hybrid",
                other
            ))),
        }
    }
}

/// Configuration passed to the engine at construction.
///
/// `required_sites` is never empty and never holds duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEngineConfig")]
pub struct EngineConfig {
    required_sites: Vec<SiteId>,
    confirm_mode: ConfirmMode,
}

#[derive(Deserialize)]
struct RawEngineConfig {
    required_sites: Vec<SiteId>,
    #[serde(default)]
    confirm_mode: ConfirmMode,
}

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = CoreError;

    fn try_from(raw: RawEngineConfig) -> Result<Self, Self::Error> {
        let sites = raw
            .required_sites
            .into_iter()
            .map(|site| SiteId::parse(site.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(sites, raw.confirm_mode)
    }
}

impl EngineConfig {
    /// Builds a config, removing duplicate sites while keeping first
    /// occurrences in order.
    pub fn new(required_sites: Vec<SiteId>, confirm_mode: ConfirmMode) -> Result<Self, CoreError> {
        let mut deduped: Vec<SiteId> = Vec::with_capacity(required_sites.len());
        for site in required_sites {
            if !deduped.contains(&site) {
                deduped.push(site);
            }
        }
        if deduped.is_empty() {
            return Err(ValidationError::OutOfBounds {
                field: "required_sites",
                value: "0".to_string(),
            }
            .into());
        }
        Ok(Self {
            required_sites: deduped,
            confirm_mode,
        })
    }

    /// Parses a comma-separated site list (`site-a,site-b`).
    pub fn parse_sites(list: &str) -> Result<Vec<SiteId>, CoreError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SiteId::parse(s).map_err(CoreError::from))
            .collect()
    }

    /// Loads a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Sites whose proofs complete the proof milestone.
    pub fn required_sites(&self) -> &[SiteId] {
        &self.required_sites
    }

    /// Ledger confirmation mode.
    pub fn confirm_mode(&self) -> ConfirmMode {
        self.confirm_mode
    }

    /// Returns a copy with a different confirmation mode.
    pub fn with_confirm_mode(mut self, confirm_mode: ConfirmMode) -> Self {
        self.confirm_mode = confirm_mode;
        self
    }

    /// Site tracked by the claim and audit milestones.
    pub fn focus_site(&self) -> &SiteId {
        &self.required_sites[0]
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            required_sites: vec![
                SiteId::new("site-a".to_string()),
                SiteId::new("site-b".to_string()),
            ],
            confirm_mode: ConfirmMode::Hybrid,
        }
    }
}
