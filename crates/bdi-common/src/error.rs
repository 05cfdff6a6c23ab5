//! Error types for BDI
//!
//! Infrastructure faults are typed variants here. Data-quality problems found
//! during validation are never errors; they travel through the validation
//! message collections instead.

use thiserror::Error;

/// Result type alias for BDI operations
pub type Result<T> = std::result::Result<T, BdiError>;

/// Main error type for BDI
#[derive(Error, Debug)]
pub enum BdiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("could not read file: {path}")]
    FileRead { path: String },

    #[error("no reader found for type \"{reader_type}\" and extension \"{extension}\"")]
    ReaderNotFound {
        reader_type: String,
        extension: String,
    },

    #[error("missing required reader metadata: {0}")]
    MissingMetadata(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
