//! `helm template` renderer

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{EngineError, Result};
use crate::renderer::{RenderedManifests, Renderer};

/// Release name passed to `helm template`
pub const DEFAULT_RELEASE_NAME: &str = "chart-analyzer";

/// Renders charts by running the helm CLI
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    binary: String,
    /// Arguments placed before the `template` subcommand
    leading_args: Vec<OsString>,
    release_name: String,
    timeout: Duration,
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self {
            binary: "helm".to_string(),
            leading_args: Vec::new(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl HelmRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Run helm through a wrapper, e.g. `sh /path/to/helm-script`
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn release_name(mut self, name: impl Into<String>) -> Self {
        self.release_name = name.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for one `helm template` run
    fn build_args(
        &self,
        chart_dir: &Path,
        values_file: Option<&Path>,
        overrides: &BTreeMap<String, String>,
    ) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.extend([
            "template".into(),
            self.release_name.clone().into(),
            chart_dir.as_os_str().to_owned(),
        ]);
        if let Some(file) = values_file {
            args.push("-f".into());
            args.push(file.as_os_str().to_owned());
        }
        for (key, value) in overrides {
            args.push("--set".into());
            args.push(format!("{}={}", key, value).into());
        }
        args
    }
}

#[async_trait]
impl Renderer for HelmRenderer {
    async fn render(
        &self,
        chart_dir: &Path,
        values: Option<&str>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<RenderedManifests> {
        // Lives until the end of the call; helm reads it while running
        let values_dir = match values.filter(|v| !v.is_empty()) {
            Some(content) => {
                let dir = tempfile::Builder::new().prefix("values-").tempdir()?;
                std::fs::write(dir.path().join("values.yaml"), content)?;
                Some(dir)
            }
            None => None,
        };
        let values_file = values_dir.as_ref().map(|d| d.path().join("values.yaml"));

        let args = self.build_args(chart_dir, values_file.as_deref(), overrides);
        tracing::debug!(
            "running {} template for {} ({} overrides)",
            self.binary,
            chart_dir.display(),
            overrides.len()
        );

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::HelmNotFound {
                        binary: self.binary.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EngineError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(EngineError::RenderFailed {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| EngineError::InvalidOutput)?;
        let rendered = RenderedManifests::from_output(&stdout);
        tracing::debug!("rendered {} documents", rendered.document_count);

        Ok(rendered)
    }
}
