//! Git acquisition through the system `git` binary
//!
//! Every command runs with captured output, no terminal prompts and a
//! deadline. Children are killed when their future is dropped, so a caller
//! that abandons a resolution also stops the transfer.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Result, SourceError};
use crate::locator::GitRef;

/// Builder for a single git invocation
#[derive(Debug, Clone)]
pub struct GitCommand {
    binary: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GitCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Name of the git subcommand, used in error messages
    fn operation(&self) -> String {
        self.args
            .iter()
            .find(|arg| !arg.starts_with('-'))
            .cloned()
            .unwrap_or_else(|| "command".to_string())
    }

    /// Run the command and return its output regardless of exit status
    pub async fn execute(self) -> Result<Output> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("running {} {}", self.binary, self.args.join(" "));

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::GitNotFound {
                    binary: self.binary.clone(),
                }
            } else {
                SourceError::Io(e)
            }
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| SourceError::Timeout {
                    operation: format!("git {}", self.operation()),
                    seconds: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(output)
    }

    /// Run the command and fail on a non-zero exit status
    pub async fn execute_success(self) -> Result<Output> {
        let operation = self.operation();
        let output = self.execute().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SourceError::GitFailed {
                operation,
                message: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }
        Ok(output)
    }
}

/// Shallow cloner for chart repositories
#[derive(Debug, Clone)]
pub struct GitCloner {
    binary: String,
    timeout: Duration,
}

impl GitCloner {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn command(&self) -> GitCommand {
        GitCommand::new(&self.binary).timeout(self.timeout)
    }

    /// Fetch a depth-1 snapshot of `url` at `git_ref` into `dest`
    ///
    /// A named ref is fetched alone by its fully qualified name. Without a
    /// ref the default branch is cloned and other branches stay visible.
    pub async fn shallow_clone(&self, url: &str, git_ref: &GitRef, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy().to_string();

        let Some(full_ref) = git_ref.full_name() else {
            self.command()
                .args(["clone", "--quiet", "--depth", "1", "--no-single-branch", "--"])
                .args([url, dest_str.as_str()])
                .execute_success()
                .await?;
            return Ok(());
        };

        tracing::debug!("fetching {} at {}", url, full_ref);

        self.command()
            .args(["init", "--quiet", "--", dest_str.as_str()])
            .execute_success()
            .await?;
        self.command()
            .current_dir(dest)
            .args(["fetch", "--quiet", "--depth", "1", "--no-tags", "--"])
            .args([url, full_ref.as_str()])
            .execute_success()
            .await?;
        self.command()
            .current_dir(dest)
            .args(["checkout", "--quiet", "FETCH_HEAD"])
            .execute_success()
            .await?;

        Ok(())
    }
}
