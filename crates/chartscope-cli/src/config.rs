//! Analyzer configuration
//!
//! Stored in `~/.config/chartscope/config.yaml`. Every field is optional;
//! missing fields take their defaults.

use chartscope_engine::DEFAULT_RELEASE_NAME;
use chartscope_registry::Platform;
use chartscope_source::ResolverOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, Result};

/// Analyzer configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    pub helm_binary: String,
    pub git_binary: String,
    /// `os/arch[/variant]` used when no platform is requested
    pub default_platform: String,
    pub release_name: String,

    #[serde(with = "humantime_serde")]
    pub clone_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub download_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub render_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub registry_timeout: Duration,

    /// Images inspected at once
    pub inspect_concurrency: usize,

    /// Registries reached over plain HTTP
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_auth: Option<RegistryAuthConfig>,
}

/// Basic credentials sent to every registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            helm_binary: "helm".to_string(),
            git_binary: "git".to_string(),
            default_platform: Platform::default().to_string(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            clone_timeout: Duration::from_secs(300),
            download_timeout: Duration::from_secs(120),
            render_timeout: Duration::from_secs(120),
            registry_timeout: Duration::from_secs(120),
            inspect_concurrency: 4,
            insecure_registries: Vec::new(),
            registry_auth: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load from `path` when given, else from the default location
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))
    }

    /// Get default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chartscope").join("config.yaml"))
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, helm: Option<String>, platform: Option<String>) -> Self {
        if let Some(helm) = helm.filter(|h| !h.is_empty()) {
            self.helm_binary = helm;
        }
        if let Some(platform) = platform.filter(|p| !p.is_empty()) {
            self.default_platform = platform;
        }
        self
    }

    pub fn platform(&self) -> Platform {
        Platform::parse(&self.default_platform)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            git_binary: self.git_binary.clone(),
            clone_timeout: self.clone_timeout,
            download_timeout: self.download_timeout,
            temp_root: None,
        }
    }
}
