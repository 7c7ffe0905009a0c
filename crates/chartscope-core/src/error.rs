//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart.yaml not found at subpath {}", path.display())]
    ChartNotFoundAtHint { path: PathBuf },

    #[error("could not locate Chart.yaml under {}", root.display())]
    ChartNotFound { root: PathBuf },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Refusing to extract archive entry outside destination: {entry}")]
    UnsafeArchiveEntry { entry: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error means no chart manifest could be found
    pub fn is_chart_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ChartNotFound { .. } | CoreError::ChartNotFoundAtHint { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
