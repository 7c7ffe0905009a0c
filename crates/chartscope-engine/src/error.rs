//! Engine error types

use miette::Diagnostic;
use thiserror::Error;

/// Rendering errors
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error("helm executable '{binary}' not found in PATH")]
    #[diagnostic(
        code(chartscope::engine::helm_not_found),
        help("Install helm 3 or point --helm / CHARTSCOPE_HELM at the binary")
    )]
    HelmNotFound { binary: String },

    #[error("helm template error: {stderr}")]
    #[diagnostic(code(chartscope::engine::render))]
    RenderFailed { stderr: String },

    #[error("rendering timed out after {seconds}s")]
    #[diagnostic(code(chartscope::engine::timeout))]
    Timeout { seconds: u64 },

    #[error("rendered output is not valid UTF-8")]
    #[diagnostic(code(chartscope::engine::encoding))]
    InvalidOutput,

    #[error("IO error: {0}")]
    #[diagnostic(code(chartscope::engine::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
