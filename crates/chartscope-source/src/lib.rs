//! chartscope source resolution
//!
//! Turns a chart locator into a local directory holding the chart:
//!
//! - **Local paths**: used in place
//! - **GitHub tree URLs**: `https://github.com/<org>/<repo>/tree/<ref>/<path>`
//! - **Packaged archives**: any HTTP(S) URL ending in `.tgz`
//! - **Git remotes**: `.git` URLs, SSH forms and other GitHub URLs
//!
//! Remote content is materialized in a private temporary directory owned by
//! the returned [`ChartWorkspace`], which removes it on release or drop.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartscope_source::{ResolverOptions, SourceRequest, SourceResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = SourceResolver::new(ResolverOptions::default())?;
//! let request = SourceRequest::url("https://github.com/bitnami/charts/tree/main/bitnami/nginx");
//!
//! let mut workspace = resolver.resolve(&request).await?;
//! println!("chart at {}", workspace.chart_dir().display());
//! workspace.release();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod git;
pub mod http;
pub mod locator;
pub mod resolver;
pub mod workspace;

// Re-exports for convenience
pub use error::{LocatorError, Result, SourceError};
pub use git::{GitCloner, GitCommand};
pub use http::ChartDownloader;
pub use locator::{GitHubTree, GitRef, InvalidLocator, LocatorKind, SourceRequest, classify};
pub use resolver::{ResolverOptions, SourceResolver};
pub use workspace::{ChartWorkspace, Provenance};
