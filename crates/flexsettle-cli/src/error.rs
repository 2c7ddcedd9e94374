use flexsettle_core::CoreError;
use flexsettle_engine::EngineError;
use flexsettle_journal::JournalError;
use flexsettle_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to open journal: {0}")]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    Config(#[from] CoreError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
