//! Resolved chart workspaces and their provenance

use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Where resolved chart content came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Absolute local path or the original remote locator
    pub origin: String,
    /// Branch or tag, empty when none applies
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Chart directory relative to the fetched content, empty for the root
    pub subpath: String,
}

/// A resolved chart plus the temporary directory holding it
///
/// The temporary directory is removed by [`ChartWorkspace::release`] or,
/// failing that, when the workspace is dropped.
#[derive(Debug)]
pub struct ChartWorkspace {
    temp: Option<TempDir>,
    root: PathBuf,
    chart_dir: PathBuf,
    provenance: Provenance,
}

impl ChartWorkspace {
    pub(crate) fn new(temp: TempDir, chart_dir: PathBuf, provenance: Provenance) -> Self {
        Self {
            root: temp.path().to_path_buf(),
            temp: Some(temp),
            chart_dir,
            provenance,
        }
    }

    /// Root of the temporary working directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `Chart.yaml`
    pub fn chart_dir(&self) -> &Path {
        &self.chart_dir
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Whether the working directory has already been removed
    pub fn is_released(&self) -> bool {
        self.temp.is_none()
    }

    /// Remove the working directory
    ///
    /// Safe to call more than once. Removal failures are logged, not returned.
    pub fn release(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };
        match temp.close() {
            Ok(()) => tracing::debug!("released working directory {}", self.root.display()),
            Err(e) => tracing::warn!(
                "failed to remove working directory {}: {}",
                self.root.display(),
                e
            ),
        }
    }
}

impl Drop for ChartWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}
