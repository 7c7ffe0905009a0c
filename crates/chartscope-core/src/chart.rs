//! Chart root discovery and Chart.yaml metadata

use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// File name that marks a directory as a chart root
pub const CHART_MANIFEST: &str = "Chart.yaml";

/// Check whether `dir` directly contains a chart manifest
#[must_use]
pub fn has_chart_manifest(dir: &Path) -> bool {
    dir.join(CHART_MANIFEST).is_file()
}

/// Find the chart root inside `root`
///
/// With a non-empty `subpath_hint`, only `root/<hint>` is considered.
/// Without one, `root` itself is tried first, then the tree is walked
/// depth-first in lexical order and the first directory holding a
/// `Chart.yaml` wins.
pub fn locate_chart_root(root: &Path, subpath_hint: &str) -> Result<PathBuf> {
    let hint = subpath_hint.trim().trim_start_matches('/');
    if !hint.is_empty() {
        let candidate = root.join(hint);
        if has_chart_manifest(&candidate) {
            return Ok(candidate);
        }
        return Err(CoreError::ChartNotFoundAtHint { path: candidate });
    }

    if has_chart_manifest(root) {
        return Ok(root.to_path_buf());
    }

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .find(|entry| has_chart_manifest(entry.path()))
        .map(|entry| entry.into_path())
        .ok_or_else(|| CoreError::ChartNotFound {
            root: root.to_path_buf(),
        })
}

/// The subset of Chart.yaml the analyzer reports on
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// API version (v1 or v2)
    #[serde(default)]
    pub api_version: Option<String>,

    /// Chart name
    pub name: String,

    /// Chart version
    #[serde(default)]
    pub version: Option<String>,

    /// Version of the packaged application
    #[serde(default)]
    pub app_version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Chart type (application or library)
    #[serde(default, rename = "type")]
    pub chart_type: Option<String>,
}

impl ChartMetadata {
    /// Load metadata from the `Chart.yaml` inside `chart_dir`
    pub fn load(chart_dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(chart_dir.join(CHART_MANIFEST))?;
        Self::parse(&content)
    }

    /// Parse Chart.yaml content
    pub fn parse(content: &str) -> Result<Self> {
        let metadata: Self = serde_yaml::from_str(content)?;
        if metadata.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: "name must not be empty".to_string(),
            });
        }
        Ok(metadata)
    }
}
