//! Global flags and engine construction.

use clap::Args;
use flexsettle_core::{ConfirmMode, EngineConfig, SimulatedLedger};
use flexsettle_engine::Engine;
use flexsettle_store::{JournalStore, WriteOptions};
use std::fs;
use std::path::PathBuf;

use crate::error::CliError;

/// Engine type every command runs against.
pub type CliEngine = Engine<JournalStore, SimulatedLedger>;

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to the journal file
    #[arg(long, global = true, env = "FLEXSETTLE_JOURNAL", default_value = "flexsettle.fsj")]
    pub journal: PathBuf,
    /// JSON config file (`required_sites`, `confirm_mode`)
    #[arg(long, global = true, env = "FLEXSETTLE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Ledger confirmation mode: sync or hybrid (overrides the config file)
    #[arg(long, global = true, env = "FLEXSETTLE_CONFIRM_MODE")]
    pub confirm_mode: Option<String>,
    /// Comma-separated required sites (overrides the config file)
    #[arg(long, global = true, env = "FLEXSETTLE_REQUIRED_SITES")]
    pub required_sites: Option<String>,
    /// Fsync the journal after every commit
    #[arg(long, global = true)]
    pub sync: bool,
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    /// Defaults, then the config file, then flags and environment.
    pub fn engine_config(&self) -> Result<EngineConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
            None => EngineConfig::default(),
        };
        if let Some(list) = &self.required_sites {
            config = EngineConfig::new(EngineConfig::parse_sites(list)?, config.confirm_mode())?;
        }
        if let Some(mode) = &self.confirm_mode {
            config = config.with_confirm_mode(mode.parse::<ConfirmMode>()?);
        }
        Ok(config)
    }

    pub fn open_engine(&self) -> Result<CliEngine, CliError> {
        let config = self.engine_config()?;
        let store = JournalStore::open_with(
            &self.journal,
            WriteOptions {
                sync: self.sync,
                ..WriteOptions::default()
            },
        )?;
        tracing::debug!(
            journal = %self.journal.display(),
            confirm_mode = config.confirm_mode().as_str(),
            required_sites = config.required_sites().len(),
            "engine ready"
        );
        Ok(Engine::new(store, SimulatedLedger::default(), config))
    }
}
