//! Renderer contract

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Output of a successful render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedManifests {
    /// Rendered YAML stream, trimmed
    pub text: String,
    /// Number of YAML documents in `text`
    pub document_count: usize,
}

impl RenderedManifests {
    /// Wrap raw renderer output
    pub fn from_output(output: &str) -> Self {
        let text = output.trim().to_string();
        let document_count = count_documents(&text);
        Self {
            text,
            document_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Renders a chart directory into Kubernetes manifests
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `chart_dir` with an optional values document and `key=value` overrides
    async fn render(
        &self,
        chart_dir: &Path,
        values: Option<&str>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<RenderedManifests>;
}

/// Count documents in a rendered stream
///
/// Empty output has no documents; otherwise every `---` separator line
/// starts one more. A leading separator is counted too.
#[must_use]
pub fn count_documents(rendered: &str) -> usize {
    let rendered = rendered.trim();
    if rendered.is_empty() {
        return 0;
    }
    1 + rendered
        .lines()
        .filter(|line| line.trim() == "---")
        .count()
}
