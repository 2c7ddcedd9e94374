use thiserror::Error;

/// Core error types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Proof codec failure.
    #[error("proof codec error: {0}")]
    Codec(#[from] CodecError),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Identifier or field validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] flexsettle_canonical::ValidationError),
}

/// Error during proof canonicalization.
#[derive(Error, Debug)]
pub enum CodecError {
    /// `raw_payload` must be a JSON object.
    #[error("raw_payload must be a JSON object, got {0}")]
    RawPayloadNotObject(&'static str),
    /// Canonicalization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] flexsettle_canonical::CanonicalizationError),
    /// Canonical bytes were not valid UTF-8.
    #[error("canonical payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
