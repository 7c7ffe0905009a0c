//! Error types for chart source resolution

use chartscope_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// The locator itself is unusable; retrying will not help
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("empty chart_url")]
    Empty,

    #[error("unsupported chart_url format: {locator}")]
    Unsupported { locator: String },

    #[error("unrecognized GitHub tree URL: {url}")]
    UnrecognizedGitHubTree { url: String },
}

/// Source resolution errors
#[derive(Debug, Error)]
pub enum SourceError {
    // ============ Input Errors ============
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error("cannot resolve local path {}: {source}", path.display())]
    LocalPath {
        path: PathBuf,
        source: std::io::Error,
    },

    // ============ Acquisition Errors ============
    #[error("git executable '{binary}' not found in PATH")]
    GitNotFound { binary: String },

    #[error("git {operation} failed: {message}")]
    GitFailed { operation: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Failed to unpack chart archive: {0}")]
    Archive(CoreError),

    // ============ Chart Errors ============
    #[error(transparent)]
    ChartNotFound(CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether the caller supplied an unusable locator
    pub fn is_client_error(&self) -> bool {
        matches!(self, SourceError::Locator(_) | SourceError::LocalPath { .. })
    }

    /// Whether the chart content was fetched but no chart root was found
    pub fn is_chart_not_found(&self) -> bool {
        matches!(self, SourceError::ChartNotFound(_))
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

impl From<CoreError> for SourceError {
    fn from(e: CoreError) -> Self {
        match e {
            e if e.is_chart_not_found() => SourceError::ChartNotFound(e),
            CoreError::Io(io) => SourceError::Io(io),
            other => SourceError::Archive(other),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            SourceError::HttpStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else if e.is_connect() {
            SourceError::Network {
                message: format!("Connection failed: {}", e),
            }
        } else {
            SourceError::Network {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let not_found: SourceError = CoreError::ChartNotFound {
            root: PathBuf::from("/tmp/x"),
        }
        .into();
        assert!(not_found.is_chart_not_found());

        let archive: SourceError = CoreError::Archive {
            message: "corrupt deflate stream".to_string(),
        }
        .into();
        assert!(matches!(archive, SourceError::Archive(_)));
        assert!(archive.to_string().contains("corrupt deflate stream"));
    }

    #[test]
    fn test_client_errors() {
        assert!(SourceError::from(LocatorError::Empty).is_client_error());
        assert!(
            !SourceError::HttpStatus {
                status: 404,
                url: "https://example.com/chart.tgz".to_string(),
            }
            .is_client_error()
        );
    }
}
