//! Chart source resolver
//!
//! Resolution creates a fresh working directory, classifies the request and
//! runs the matching acquisition strategy inside it. Any error drops the
//! working directory before it reaches the caller; on success it is handed
//! over inside a [`ChartWorkspace`].

use chartscope_core::{extract_archive, locate_chart_root};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::error::{Result, SourceError};
use crate::git::GitCloner;
use crate::http::ChartDownloader;
use crate::locator::{GitHubTree, GitRef, LocatorKind, SourceRequest, classify};
use crate::workspace::{ChartWorkspace, Provenance};

/// Prefix of every working directory name
const WORKDIR_PREFIX: &str = "chart-work-";

/// Tunables for source resolution
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// git executable
    pub git_binary: String,
    /// Deadline for each git step
    pub clone_timeout: Duration,
    /// Deadline for a whole archive download
    pub download_timeout: Duration,
    /// Parent for working directories (system temp dir when unset)
    pub temp_root: Option<PathBuf>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            clone_timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(120),
            temp_root: None,
        }
    }
}

/// What a strategy produced
struct Acquired {
    chart_dir: PathBuf,
    provenance: Provenance,
}

/// Resolves chart locators into local chart directories
#[derive(Debug, Clone)]
pub struct SourceResolver {
    options: ResolverOptions,
    git: GitCloner,
    downloader: ChartDownloader,
}

impl SourceResolver {
    pub fn new(options: ResolverOptions) -> Result<Self> {
        let git = GitCloner::new(options.git_binary.clone(), options.clone_timeout);
        let downloader = ChartDownloader::new(options.download_timeout)?;
        Ok(Self {
            options,
            git,
            downloader,
        })
    }

    /// Resolve a request into a chart workspace
    pub async fn resolve(&self, request: &SourceRequest) -> Result<ChartWorkspace> {
        let temp = self.create_workdir()?;
        let work = temp.path();
        let kind = classify(request);

        tracing::debug!("resolving {:?} locator in {}", kind, work.display());

        let acquired = match kind {
            LocatorKind::Local => self.acquire_local(request, work).await?,
            LocatorKind::GitHubTree => self.acquire_github_tree(request, work).await?,
            LocatorKind::Archive => self.acquire_archive(request, work).await?,
            LocatorKind::GitRemote => self.acquire_git_remote(request, work).await?,
            LocatorKind::Invalid(invalid) => {
                return Err(invalid.into_error(&request.chart_url).into());
            }
        };

        tracing::debug!("chart resolved at {}", acquired.chart_dir.display());

        Ok(ChartWorkspace::new(
            temp,
            acquired.chart_dir,
            acquired.provenance,
        ))
    }

    fn create_workdir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        let temp = match &self.options.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(temp)
    }

    /// Local directories are used in place and trusted as chart roots
    async fn acquire_local(&self, request: &SourceRequest, _work: &Path) -> Result<Acquired> {
        let path = PathBuf::from(&request.local_path);
        let absolute = std::path::absolute(&path)
            .map(|absolute| normalize_lexically(&absolute))
            .map_err(|source| SourceError::LocalPath { path, source })?;

        Ok(Acquired {
            provenance: Provenance {
                origin: absolute.to_string_lossy().to_string(),
                ..Default::default()
            },
            chart_dir: absolute,
        })
    }

    /// The URL names the ref and subpath; the subpath is trusted as given
    async fn acquire_github_tree(&self, request: &SourceRequest, work: &Path) -> Result<Acquired> {
        let tree = GitHubTree::parse(&request.chart_url)?;
        let clone_dir = work.join("repo");

        self.git
            .shallow_clone(&tree.clone_url(), &GitRef::classify(&tree.git_ref), &clone_dir)
            .await?;

        let chart_dir = if tree.subpath.is_empty() {
            clone_dir
        } else {
            clone_dir.join(&tree.subpath)
        };

        Ok(Acquired {
            chart_dir,
            provenance: Provenance {
                origin: request.chart_url.clone(),
                git_ref: tree.git_ref,
                subpath: tree.subpath,
            },
        })
    }

    async fn acquire_archive(&self, request: &SourceRequest, work: &Path) -> Result<Acquired> {
        let archive_path = work.join("chart.tgz");
        self.downloader
            .download_to(&request.chart_url, &archive_path)
            .await?;

        let extract_dir = work.join("extracted");
        let chart_dir = {
            let extract_dir = extract_dir.clone();
            let hint = request.subpath.clone();
            blocking(move || {
                extract_archive(&archive_path, &extract_dir)?;
                locate_chart_root(&extract_dir, &hint)
            })
            .await?
        };
        let subpath = relative_subpath(&extract_dir, &chart_dir);

        Ok(Acquired {
            chart_dir,
            provenance: Provenance {
                origin: request.chart_url.clone(),
                git_ref: request.git_ref.clone(),
                subpath,
            },
        })
    }

    async fn acquire_git_remote(&self, request: &SourceRequest, work: &Path) -> Result<Acquired> {
        let clone_dir = work.join("repo");
        self.git
            .shallow_clone(
                &request.chart_url,
                &GitRef::classify(&request.git_ref),
                &clone_dir,
            )
            .await?;

        let hint = request.subpath.clone();
        let chart_dir = blocking(move || locate_chart_root(&clone_dir, &hint)).await?;

        Ok(Acquired {
            chart_dir,
            provenance: Provenance {
                origin: request.chart_url.clone(),
                git_ref: request.git_ref.clone(),
                subpath: request.subpath.clone(),
            },
        })
    }
}

/// Run filesystem work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> chartscope_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SourceError::Io(std::io::Error::other(e.to_string())))?
        .map_err(SourceError::from)
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `dir` relative to `base`, `/`-separated, empty when they are equal
fn relative_subpath(base: &Path, dir: &Path) -> String {
    dir.strip_prefix(base)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocatorError;
    use std::fs;
    use std::process::Command;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_in(temp_root: &Path) -> SourceResolver {
        SourceResolver::new(ResolverOptions {
            temp_root: Some(temp_root.to_path_buf()),
            clone_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(10),
            ..Default::default()
        })
        .unwrap()
    }

    fn is_empty_dir(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    fn write_chart(dir: &Path, name: &str) {
        fs::create_dir_all(dir.join("templates")).unwrap();
        fs::write(
            dir.join("Chart.yaml"),
            format!("apiVersion: v2\nname: {}\nversion: 0.1.0\n", name),
        )
        .unwrap();
    }

    fn packaged_chart(temp: &Path) -> Vec<u8> {
        let src = temp.join("src");
        write_chart(&src.join("demo"), "demo");
        fs::write(src.join("demo").join("values.yaml"), "replicas: 1\n").unwrap();
        let archive = temp.join("demo-0.1.0.tgz");
        chartscope_core::create_archive(&src, &archive).unwrap();
        fs::read(archive).unwrap()
    }

    #[test]
    fn test_relative_subpath() {
        let base = Path::new("/work/extracted");
        assert_eq!(relative_subpath(base, &base.join("demo")), "demo");
        assert_eq!(relative_subpath(base, &base.join("a").join("b")), "a/b");
        assert_eq!(relative_subpath(base, base), "");
    }

    #[tokio::test]
    async fn test_resolve_local_path() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(temp.path());

        let workspace = resolver
            .resolve(&SourceRequest::local("charts/app").with_ref("ignored"))
            .await
            .unwrap();

        let expected = std::env::current_dir().unwrap().join("charts/app");
        assert_eq!(workspace.chart_dir(), expected.as_path());
        assert_eq!(workspace.provenance().origin, expected.to_string_lossy());
        assert!(workspace.provenance().git_ref.is_empty());
        assert!(workspace.provenance().subpath.is_empty());

        let dotted = temp.path().join("charts").join("..").join(".").join("app");
        let workspace = resolver
            .resolve(&SourceRequest::local(dotted.to_string_lossy()))
            .await
            .unwrap();
        let expected = temp.path().join("app");
        assert_eq!(workspace.chart_dir(), expected.as_path());
        assert_eq!(workspace.provenance().origin, expected.to_string_lossy());
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/srv/charts/../app/./web")),
            PathBuf::from("/srv/app/web")
        );
        assert_eq!(normalize_lexically(Path::new("/..")), PathBuf::from("/"));
    }

    #[tokio::test]
    async fn test_resolve_invalid_locators_leave_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(temp.path());

        let err = resolver.resolve(&SourceRequest::default()).await.unwrap_err();
        assert!(matches!(err, SourceError::Locator(LocatorError::Empty)));

        let err = resolver
            .resolve(&SourceRequest::url("https://example.com/chart.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Locator(LocatorError::Unsupported { .. })));

        let err = resolver
            .resolve(&SourceRequest::url("https://github.com/o/tree/main"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unrecognized"));
        assert!(err.is_client_error());

        assert!(is_empty_dir(temp.path()));
    }

    #[tokio::test]
    async fn test_resolve_archive() {
        let temp = TempDir::new().unwrap();
        let body = packaged_chart(temp.path());

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charts/demo-0.1.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let work_root = temp.path().join("work");
        let resolver = resolver_in(&work_root);
        let url = format!("{}/charts/demo-0.1.0.tgz", server.uri());

        let mut workspace = resolver
            .resolve(&SourceRequest::url(&url).with_ref("0.1.0"))
            .await
            .unwrap();

        assert!(workspace.chart_dir().join("Chart.yaml").is_file());
        assert!(workspace.chart_dir().ends_with("extracted/demo"));
        assert_eq!(
            workspace.provenance(),
            &Provenance {
                origin: url.clone(),
                git_ref: "0.1.0".to_string(),
                subpath: "demo".to_string(),
            }
        );

        let root = workspace.root().to_path_buf();
        assert!(root.starts_with(&work_root));
        workspace.release();
        assert!(!root.exists());
        assert!(is_empty_dir(&work_root));
    }

    #[tokio::test]
    async fn test_resolve_archive_wrong_hint() {
        let temp = TempDir::new().unwrap();
        let body = packaged_chart(temp.path());

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let work_root = temp.path().join("work");
        let resolver = resolver_in(&work_root);

        let err = resolver
            .resolve(
                &SourceRequest::url(format!("{}/demo.tgz", server.uri())).with_subpath("nope"),
            )
            .await
            .unwrap_err();

        assert!(err.is_chart_not_found());
        assert!(is_empty_dir(&work_root));
    }

    #[tokio::test]
    async fn test_resolve_archive_http_failure() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resolver = resolver_in(temp.path());
        let err = resolver
            .resolve(&SourceRequest::url(format!("{}/demo.tgz", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::HttpStatus { status: 500, .. }));
        assert!(is_empty_dir(temp.path()));
    }

    #[tokio::test]
    async fn test_resolve_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a tarball".to_vec()))
            .mount(&server)
            .await;

        let resolver = resolver_in(temp.path());
        let err = resolver
            .resolve(&SourceRequest::url(format!("{}/demo.TGZ", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Archive(_)));
        assert!(is_empty_dir(temp.path()));
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args([
                "-c",
                "user.name=chartscope",
                "-c",
                "user.email=chartscope@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "init.defaultBranch=main",
            ])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// Repository with `charts/app` on `main` and tag `v1.0.0`, plus a
    /// `develop` branch that moves the chart to `charts/next`
    fn origin_repo(temp: &Path) -> String {
        let origin = temp.join("origin.git");
        fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "--quiet"]);
        write_chart(&origin.join("charts").join("app"), "app");
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "--quiet", "-m", "initial"]);
        git(&origin, &["tag", "v1.0.0"]);
        git(&origin, &["checkout", "--quiet", "-b", "develop"]);
        fs::rename(origin.join("charts").join("app"), origin.join("charts").join("next")).unwrap();
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "--quiet", "-m", "move"]);
        git(&origin, &["checkout", "--quiet", "main"]);
        format!("file://{}", origin.display())
    }

    #[tokio::test]
    async fn test_resolve_git_remote() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let url = origin_repo(temp.path());
        let work_root = temp.path().join("work");
        let resolver = resolver_in(&work_root);

        let tagged = resolver
            .resolve(&SourceRequest::url(&url).with_ref("v1.0.0"))
            .await
            .unwrap();
        assert!(tagged.chart_dir().ends_with("repo/charts/app"));
        assert_eq!(tagged.provenance().git_ref, "v1.0.0");

        let branch = resolver
            .resolve(&SourceRequest::url(&url).with_ref("develop"))
            .await
            .unwrap();
        assert!(branch.chart_dir().ends_with("repo/charts/next"));

        let default = resolver
            .resolve(&SourceRequest::url(&url).with_subpath("charts/app"))
            .await
            .unwrap();
        assert!(default.chart_dir().ends_with("repo/charts/app"));
        assert_eq!(default.provenance().subpath, "charts/app");
        assert!(default.provenance().git_ref.is_empty());

        drop((tagged, branch, default));
        assert!(is_empty_dir(&work_root));
    }

    #[tokio::test]
    async fn test_resolve_rejects_option_like_git_url() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let work_root = temp.path().join("work");
        let resolver = resolver_in(&work_root);

        let url = format!("--upload-pack=touch {};.git", marker.display());
        let err = resolver
            .resolve(&SourceRequest::url(url).with_ref("main"))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Locator(LocatorError::Unsupported { .. })));
        assert!(err.is_client_error());
        assert!(!marker.exists());
        assert!(is_empty_dir(&work_root));
    }

    #[tokio::test]
    async fn test_resolve_git_remote_missing_ref() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let url = origin_repo(temp.path());
        let work_root = temp.path().join("work");
        let resolver = resolver_in(&work_root);

        let err = resolver
            .resolve(&SourceRequest::url(&url).with_ref("v9.9.9"))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::GitFailed { .. }));
        assert!(is_empty_dir(&work_root));
    }
}
