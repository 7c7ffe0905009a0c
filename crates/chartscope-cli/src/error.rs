//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`] at the binary edge so each
//! failure class maps to a stable exit code.

use chartscope_engine::EngineError;
use chartscope_source::SourceError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Caller supplied unusable input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(chartscope::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration file could not be read
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartscope::cli::config))]
    Config { message: String },

    /// Chart could not be fetched or located
    #[error("Source error: {message}")]
    #[diagnostic(code(chartscope::cli::source))]
    Source {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Rendering failed
    #[error("Render error: {message}")]
    #[diagnostic(code(chartscope::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartscope::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartscope::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } | CliError::Config { .. } => exit_codes::INPUT_ERROR,
            CliError::Source { .. } => exit_codes::SOURCE_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<SourceError> for CliError {
    fn from(err: SourceError) -> Self {
        if err.is_client_error() {
            return Self::Input {
                message: err.to_string(),
                help: Some(
                    "use a local path, a GitHub tree URL, a .tgz URL or a git remote".to_string(),
                ),
            };
        }
        let help = match &err {
            SourceError::GitNotFound { .. } => {
                Some("install git or set gitBinary in the config".to_string())
            }
            SourceError::ChartNotFound(_) => {
                Some("pass --subpath to point at the chart directory".to_string())
            }
            _ => None,
        };
        Self::Source {
            message: err.to_string(),
            help,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let help = match &err {
            EngineError::HelmNotFound { .. } => {
                Some("install helm or pass --helm / set CHARTSCOPE_HELM".to_string())
            }
            _ => None,
        };
        Self::Render {
            message: err.to_string(),
            help,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
