//! Locator classification
//!
//! A request is classified by walking an ordered rule table; the first rule
//! whose predicate matches decides the acquisition strategy.

use url::Url;

use crate::error::LocatorError;

/// Where to obtain a chart from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRequest {
    /// Remote locator (GitHub tree URL, `.tgz` URL or git remote)
    pub chart_url: String,
    /// Local chart directory; takes precedence over `chart_url`
    pub local_path: String,
    /// Branch or tag to check out
    pub git_ref: String,
    /// Chart directory relative to the fetched content
    pub subpath: String,
}

impl SourceRequest {
    /// Request for a remote locator
    pub fn url(chart_url: impl Into<String>) -> Self {
        Self {
            chart_url: chart_url.into(),
            ..Default::default()
        }
    }

    /// Request for a chart directory on disk
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            local_path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.subpath = subpath.into();
        self
    }
}

/// Acquisition strategy for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Local,
    GitHubTree,
    Archive,
    GitRemote,
    Invalid(InvalidLocator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidLocator {
    Empty,
    Unsupported,
}

impl InvalidLocator {
    pub fn into_error(self, locator: &str) -> LocatorError {
        match self {
            InvalidLocator::Empty => LocatorError::Empty,
            InvalidLocator::Unsupported => LocatorError::Unsupported {
                locator: locator.to_string(),
            },
        }
    }
}

struct Rule {
    matches: fn(&SourceRequest) -> bool,
    kind: LocatorKind,
}

/// Classification rules in precedence order
const RULES: &[Rule] = &[
    Rule {
        matches: is_local,
        kind: LocatorKind::Local,
    },
    Rule {
        matches: is_empty,
        kind: LocatorKind::Invalid(InvalidLocator::Empty),
    },
    Rule {
        matches: is_option_like,
        kind: LocatorKind::Invalid(InvalidLocator::Unsupported),
    },
    Rule {
        matches: is_github_tree,
        kind: LocatorKind::GitHubTree,
    },
    Rule {
        matches: is_archive,
        kind: LocatorKind::Archive,
    },
    Rule {
        matches: is_git_remote,
        kind: LocatorKind::GitRemote,
    },
];

/// Pick the acquisition strategy for a request
#[must_use]
pub fn classify(request: &SourceRequest) -> LocatorKind {
    RULES
        .iter()
        .find(|rule| (rule.matches)(request))
        .map(|rule| rule.kind)
        .unwrap_or(LocatorKind::Invalid(InvalidLocator::Unsupported))
}

fn is_local(request: &SourceRequest) -> bool {
    !request.local_path.is_empty()
}

fn is_empty(request: &SourceRequest) -> bool {
    request.chart_url.is_empty()
}

/// Anything git could read as a flag never reaches a command line
fn is_option_like(request: &SourceRequest) -> bool {
    request.chart_url.trim_start().starts_with('-')
}

fn is_github_tree(request: &SourceRequest) -> bool {
    request.chart_url.contains("github.com/") && request.chart_url.contains("/tree/")
}

fn is_archive(request: &SourceRequest) -> bool {
    request.chart_url.to_lowercase().ends_with(".tgz")
}

fn is_git_remote(request: &SourceRequest) -> bool {
    const PREFIXES: &[&str] = &["git@", "ssh://", "git+ssh://", "git+https://"];
    let url = request.chart_url.as_str();
    url.ends_with(".git")
        || PREFIXES.iter().any(|prefix| url.starts_with(prefix))
        || url.contains("github.com/")
}

/// A parsed `https://github.com/<org>/<repo>/tree/<ref>/<subpath>` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubTree {
    pub org: String,
    pub repo: String,
    pub git_ref: String,
    /// Remaining path segments joined with `/`, empty for the repository root
    pub subpath: String,
}

impl GitHubTree {
    pub fn parse(url: &str) -> Result<Self, LocatorError> {
        let unrecognized = || LocatorError::UnrecognizedGitHubTree {
            url: url.to_string(),
        };

        let absolute = if url.contains("://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };
        let parsed = Url::parse(&absolute).map_err(|_| unrecognized())?;

        let parts: Vec<&str> = parsed.path().trim_start_matches('/').split('/').collect();
        if parts.len() < 4 || parts[2] != "tree" {
            return Err(unrecognized());
        }
        if parts[0].is_empty() || parts[1].is_empty() || parts[3].is_empty() {
            return Err(unrecognized());
        }

        let subpath = parts[4..]
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");

        Ok(Self {
            org: parts[0].to_string(),
            repo: parts[1].to_string(),
            git_ref: parts[3].to_string(),
            subpath,
        })
    }

    /// Canonical HTTPS clone URL for the repository
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.org, self.repo)
    }
}

/// A git revision to check out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// The remote's default branch
    Default,
    Branch(String),
    Tag(String),
}

impl GitRef {
    /// Classify a ref name: `v`/`V`-prefixed names are tags, anything else a branch
    pub fn classify(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            GitRef::Default
        } else if name.starts_with(['v', 'V']) {
            GitRef::Tag(name.to_string())
        } else {
            GitRef::Branch(name.to_string())
        }
    }

    /// Fully qualified reference name, `None` for the default branch
    pub fn full_name(&self) -> Option<String> {
        match self {
            GitRef::Default => None,
            GitRef::Branch(name) => Some(format!("refs/heads/{}", name)),
            GitRef::Tag(name) => Some(format!("refs/tags/{}", name)),
        }
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, GitRef::Tag(_))
    }
}
