//! Chart analysis pipeline
//!
//! resolve → render → extract → inspect. Inspection failures are recorded
//! per image and never abort the run; every other failure does. The chart
//! workspace is released before [`Pipeline::analyze`] returns.

use chartscope_core::{ChartMetadata, extract_images};
use chartscope_engine::Renderer;
use chartscope_registry::{ImageInfo, ImageInspector, InspectOptions, Platform};
use chartscope_source::{ChartWorkspace, SourceRequest, SourceResolver};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{CliError, Result};

/// What to analyze and how
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub chart_url: Option<String>,
    pub local_path: Option<String>,
    pub git_ref: String,
    pub subpath: String,
    /// Values file content handed to the renderer
    pub values_yaml: Option<String>,
    pub overrides: BTreeMap<String, String>,
    /// Overrides the configured default platform
    pub platform: Option<String>,
    pub download: bool,
    pub download_dir: Option<PathBuf>,
}

/// Build a source request from the two mutually exclusive chart locations
pub fn source_request(
    chart_url: Option<&str>,
    local_path: Option<&str>,
    git_ref: &str,
    subpath: &str,
) -> Result<SourceRequest> {
    let chart_url = chart_url.map(str::trim).filter(|s| !s.is_empty());
    let local_path = local_path.map(str::trim).filter(|s| !s.is_empty());

    let request = match (chart_url, local_path) {
        (Some(url), None) => SourceRequest::url(url),
        (None, Some(path)) => SourceRequest::local(path),
        (None, None) => {
            return Err(CliError::input_with_help(
                "no chart source given",
                "pass --chart-url or --local-path",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(CliError::input_with_help(
                "--chart-url and --local-path are mutually exclusive",
                "pass exactly one chart source",
            ));
        }
    };

    Ok(request.with_ref(git_ref).with_subpath(subpath))
}

/// Where the analyzed chart came from
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartSummary {
    pub source: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl ChartSummary {
    /// Provenance plus whatever `Chart.yaml` has to say
    pub fn from_workspace(workspace: &ChartWorkspace) -> Self {
        let provenance = workspace.provenance();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        let mut summary = Self {
            source: provenance.origin.clone(),
            git_ref: non_empty(&provenance.git_ref),
            subpath: non_empty(&provenance.subpath),
            ..Default::default()
        };

        // Local paths are not validated, so the manifest may be absent
        match ChartMetadata::load(workspace.chart_dir()) {
            Ok(metadata) => {
                summary.name = Some(metadata.name);
                summary.version = metadata.version;
                summary.app_version = metadata.app_version;
            }
            Err(e) => tracing::debug!("no chart metadata: {}", e),
        }

        summary
    }
}

/// One inspected image
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    #[serde(flatten)]
    pub info: ImageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a full analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeReport {
    pub chart: ChartSummary,
    pub images: Vec<ImageReport>,
}

/// Wires a resolver, a renderer and an inspector together
pub struct Pipeline<'a> {
    resolver: &'a SourceResolver,
    renderer: &'a dyn Renderer,
    inspector: &'a dyn ImageInspector,
    concurrency: usize,
    default_platform: Platform,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        resolver: &'a SourceResolver,
        renderer: &'a dyn Renderer,
        inspector: &'a dyn ImageInspector,
    ) -> Self {
        Self {
            resolver,
            renderer,
            inspector,
            concurrency: 4,
            default_platform: Platform::default(),
        }
    }

    /// Maximum number of images inspected at once
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn default_platform(mut self, platform: Platform) -> Self {
        self.default_platform = platform;
        self
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeReport> {
        let source = source_request(
            request.chart_url.as_deref(),
            request.local_path.as_deref(),
            &request.git_ref,
            &request.subpath,
        )?;

        let mut workspace = self.resolver.resolve(&source).await?;
        let report = self.analyze_workspace(&workspace, request).await;
        workspace.release();
        report
    }

    async fn analyze_workspace(
        &self,
        workspace: &ChartWorkspace,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeReport> {
        let rendered = self
            .renderer
            .render(
                workspace.chart_dir(),
                request.values_yaml.as_deref(),
                &request.overrides,
            )
            .await?;

        let images = extract_images(&rendered.text);
        tracing::debug!(
            "found {} images in {} documents",
            images.len(),
            rendered.document_count
        );

        let platform = match request.platform.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Platform::parse(p),
            _ => self.default_platform.clone(),
        };
        let options = InspectOptions {
            platform,
            download: request.download,
            download_dir: request.download_dir.clone(),
        };

        let mut chart = ChartSummary::from_workspace(workspace);
        chart.rendered_documents = Some(rendered.document_count);

        Ok(AnalyzeReport {
            chart,
            images: self.inspect_all(images, &options).await,
        })
    }

    /// Inspect concurrently, keeping extraction order
    async fn inspect_all(&self, images: Vec<String>, options: &InspectOptions) -> Vec<ImageReport> {
        stream::iter(images)
            .map(|image| async move {
                match self.inspector.inspect(&image, options).await {
                    Ok(info) => ImageReport { info, error: None },
                    Err(e) => {
                        tracing::warn!("inspection of {} failed: {}", image, e);
                        ImageReport {
                            info: ImageInfo::unavailable(&image, &options.platform),
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chartscope_engine::{EngineError, RenderedManifests};
    use chartscope_registry::{RegistryError, human_bytes};
    use chartscope_source::ResolverOptions;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    const MANIFESTS: &str = r#"---
apiVersion: apps/v1
kind: Deployment
spec:
  template:
    spec:
      initContainers:
        - image: busybox:1.36
      containers:
        - image: nginx:1.25
        - image: missing/app:0.1
---
apiVersion: batch/v1
kind: CronJob
spec:
  jobTemplate:
    spec:
      template:
        spec:
          containers:
            - image: nginx:1.25
            - image: alpine:3.19
"#;

    #[derive(Default)]
    struct FakeRenderer {
        output: String,
        fail: bool,
        seen: Mutex<Vec<(PathBuf, Option<String>, BTreeMap<String, String>)>>,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(
            &self,
            chart_dir: &Path,
            values: Option<&str>,
            overrides: &BTreeMap<String, String>,
        ) -> chartscope_engine::Result<RenderedManifests> {
            self.seen.lock().unwrap().push((
                chart_dir.to_path_buf(),
                values.map(str::to_string),
                overrides.clone(),
            ));
            if self.fail {
                return Err(EngineError::RenderFailed {
                    stderr: "template: bad".to_string(),
                });
            }
            Ok(RenderedManifests::from_output(&self.output))
        }
    }

    /// Answers slower for earlier images so completion order differs from input order
    struct FakeInspector;

    #[async_trait]
    impl ImageInspector for FakeInspector {
        async fn inspect(
            &self,
            image: &str,
            options: &InspectOptions,
        ) -> chartscope_registry::Result<ImageInfo> {
            let delay = match image {
                "busybox:1.36" => 60,
                "nginx:1.25" => 30,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if image.starts_with("missing/") {
                return Err(RegistryError::Registry {
                    message: "manifest unknown".to_string(),
                });
            }
            Ok(ImageInfo {
                image: image.to_string(),
                resolved_ref: format!("docker.io/library/{}", image),
                digest: "sha256:0123".to_string(),
                layers: 3,
                size_bytes: 1536,
                size_human: human_bytes(1536),
                platform: options.platform.to_string(),
                downloaded: None,
            })
        }
    }

    fn chart_dir(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("demo");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("Chart.yaml"),
            "apiVersion: v2\nname: demo\nversion: 1.2.3\nappVersion: \"4.5\"\n",
        )
        .unwrap();
        dir
    }

    fn resolver(temp: &TempDir) -> SourceResolver {
        SourceResolver::new(ResolverOptions {
            temp_root: Some(temp.path().join("work")),
            ..Default::default()
        })
        .unwrap()
    }

    fn local_request(dir: &Path) -> AnalyzeRequest {
        AnalyzeRequest {
            local_path: Some(dir.to_string_lossy().to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_source_request_requires_exactly_one_location() {
        assert!(matches!(
            source_request(None, None, "", ""),
            Err(CliError::Input { .. })
        ));
        assert!(matches!(
            source_request(Some("https://x/c.tgz"), Some("."), "", ""),
            Err(CliError::Input { .. })
        ));
        assert!(matches!(
            source_request(Some("  "), None, "", ""),
            Err(CliError::Input { .. })
        ));

        let request = source_request(Some("https://x/c.tgz"), None, "v1", "charts/a").unwrap();
        assert_eq!(request.chart_url, "https://x/c.tgz");
        assert_eq!(request.git_ref, "v1");
        assert_eq!(request.subpath, "charts/a");
    }

    #[tokio::test]
    async fn test_analyze_keeps_order_and_records_failures() {
        let temp = TempDir::new().unwrap();
        let dir = chart_dir(&temp);
        let resolver = resolver(&temp);
        let renderer = FakeRenderer {
            output: MANIFESTS.to_string(),
            ..Default::default()
        };

        let report = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .concurrency(4)
            .analyze(&local_request(&dir))
            .await
            .unwrap();

        let images: Vec<&str> = report.images.iter().map(|r| r.info.image.as_str()).collect();
        assert_eq!(
            images,
            vec!["nginx:1.25", "missing/app:0.1", "busybox:1.36", "alpine:3.19"]
        );

        let failed = &report.images[1];
        assert_eq!(failed.error.as_deref(), Some("remote image: manifest unknown"));
        assert_eq!(failed.info.size_bytes, 0);
        assert_eq!(failed.info.size_human, "0 B");
        assert_eq!(failed.info.platform, "linux/amd64");

        let ok = &report.images[0];
        assert!(ok.error.is_none());
        assert_eq!(ok.info.size_human, "1.5 KB");

        assert_eq!(report.chart.name.as_deref(), Some("demo"));
        assert_eq!(report.chart.version.as_deref(), Some("1.2.3"));
        assert_eq!(report.chart.app_version.as_deref(), Some("4.5"));
        assert_eq!(report.chart.rendered_documents, Some(3));
        assert!(report.chart.git_ref.is_none());
    }

    #[tokio::test]
    async fn test_analyze_passes_values_and_platform() {
        let temp = TempDir::new().unwrap();
        let dir = chart_dir(&temp);
        let resolver = resolver(&temp);
        let renderer = FakeRenderer {
            output: MANIFESTS.to_string(),
            ..Default::default()
        };

        let mut request = local_request(&dir);
        request.values_yaml = Some("replicas: 2".to_string());
        request.overrides.insert("image.tag".to_string(), "1.26".to_string());
        request.platform = Some("linux/arm64".to_string());

        let report = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .analyze(&request)
            .await
            .unwrap();

        let seen = renderer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, std::path::absolute(&dir).unwrap());
        assert_eq!(seen[0].1.as_deref(), Some("replicas: 2"));
        assert_eq!(seen[0].2["image.tag"], "1.26");
        assert!(report.images.iter().all(|r| r.info.platform == "linux/arm64"));
    }

    #[tokio::test]
    async fn test_configured_platform_is_default() {
        let temp = TempDir::new().unwrap();
        let dir = chart_dir(&temp);
        let resolver = resolver(&temp);
        let renderer = FakeRenderer {
            output: "spec:\n  containers:\n    - image: nginx\n".to_string(),
            ..Default::default()
        };

        let report = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .default_platform(Platform::parse("linux/arm/v7"))
            .analyze(&local_request(&dir))
            .await
            .unwrap();

        assert_eq!(report.images[0].info.platform, "linux/arm/v7");
    }

    #[tokio::test]
    async fn test_render_failure_releases_workspace() {
        let temp = TempDir::new().unwrap();
        let dir = chart_dir(&temp);
        let resolver = resolver(&temp);
        let renderer = FakeRenderer {
            fail: true,
            ..Default::default()
        };

        let err = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .analyze(&local_request(&dir))
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Render { .. }));
        let leftovers = std::fs::read_dir(temp.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_empty_render_has_no_images() {
        let temp = TempDir::new().unwrap();
        let dir = chart_dir(&temp);
        let resolver = resolver(&temp);
        let renderer = FakeRenderer::default();

        let report = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .analyze(&local_request(&dir))
            .await
            .unwrap();

        assert!(report.images.is_empty());
        assert_eq!(report.chart.rendered_documents, Some(0));
    }

    #[tokio::test]
    async fn test_bad_locator_is_input_error() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver(&temp);
        let renderer = FakeRenderer::default();
        let request = AnalyzeRequest {
            chart_url: Some("ftp://example.com/chart".to_string()),
            ..Default::default()
        };

        let err = Pipeline::new(&resolver, &renderer, &FakeInspector)
            .analyze(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Input { .. }));
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_report_json_shape() {
        let report = AnalyzeReport {
            chart: ChartSummary {
                source: "/charts/demo".to_string(),
                git_ref: Some("v1.0.0".to_string()),
                rendered_documents: Some(2),
                ..Default::default()
            },
            images: vec![ImageReport {
                info: ImageInfo::unavailable("nginx", &Platform::default()),
                error: Some("boom".to_string()),
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["chart"]["ref"], "v1.0.0");
        assert!(json["chart"].get("subpath").is_none());
        assert_eq!(json["images"][0]["image"], "nginx");
        assert_eq!(json["images"][0]["size_human"], "0 B");
        assert_eq!(json["images"][0]["error"], "boom");
    }
}
