//! Error types for registry operations

use thiserror::Error;

/// Registry operation errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("parse image: invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    #[error("remote image: {message}")]
    Registry { message: String },

    #[error("inspection of {reference} timed out after {seconds}s")]
    Timeout { reference: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<oci_distribution::errors::OciDistributionError> for RegistryError {
    fn from(e: oci_distribution::errors::OciDistributionError) -> Self {
        RegistryError::Registry {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}
