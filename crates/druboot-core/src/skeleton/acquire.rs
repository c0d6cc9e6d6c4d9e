//! Skeleton acquisition from a git remote or a local directory
//!
//! Both sources end up as a plain directory tree in the workspace with the
//! repository's own `.git` removed:
//! - Remote: `git clone` into the workspace
//! - Local: recursive copy of the directory (for skeleton development)
//!
//! The workspace is always cleared first; a previous clone is never reused.

use crate::config::validate;
use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use crate::skeleton::materialize::is_unresolvable_link;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Timeout for a single clone attempt (10 minutes)
const CLONE_TIMEOUT: Duration = Duration::from_secs(600);

/// Skeleton source - either a git remote or a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonSource {
    /// Anything `git clone` accepts: a URL or an scp-like `user@host:path`
    Remote(String),
    Local(PathBuf),
}

impl SkeletonSource {
    /// Create a remote source from a product config, honoring its env override
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = std::env::var(config.skeleton_url_env())
            .unwrap_or_else(|_| config.default_skeleton_url().to_string());
        Self::remote(&url_str)
    }

    /// Create a remote source, rejecting anything that is not a git remote
    pub fn remote(remote: &str) -> Result<Self> {
        if !validate::is_git_remote(remote) {
            return Err(ScaffoldError::Acquisition {
                source_ref: remote.to_string(),
                reason: "invalid skeleton URL".to_string(),
            });
        }
        Ok(Self::Remote(remote.to_string()))
    }

    /// Create a local skeleton source from a path
    pub fn local(path: PathBuf) -> Self {
        Self::Local(path)
    }

    pub fn describe(&self) -> String {
        match self {
            SkeletonSource::Remote(remote) => remote.clone(),
            SkeletonSource::Local(path) => path.display().to_string(),
        }
    }
}

/// Retry and timeout knobs for acquisition
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    /// Total attempts, at least 1
    pub attempts: u32,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
    /// Per-attempt clone timeout
    pub timeout: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_secs(2),
            timeout: CLONE_TIMEOUT,
        }
    }
}

/// An acquired skeleton tree, stripped of version-control metadata
#[derive(Debug, Clone)]
pub struct SkeletonWorkspace {
    root: PathBuf,
}

impl SkeletonWorkspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete the workspace directory
    pub async fn discard(self) -> Result<()> {
        clear_path(&self.root).await.map_err(|e| ScaffoldError::Acquisition {
            source_ref: self.root.display().to_string(),
            reason: format!("failed to remove workspace: {}", e),
        })
    }
}

/// Skeleton fetcher - retrieves the skeleton into a scratch workspace
#[derive(Debug, Clone)]
pub struct SkeletonFetcher {
    source: SkeletonSource,
    options: AcquireOptions,
}

impl SkeletonFetcher {
    pub fn new(source: SkeletonSource) -> Self {
        Self {
            source,
            options: AcquireOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AcquireOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &SkeletonSource {
        &self.source
    }

    /// Fetch the skeleton into `workspace`, replacing anything already there
    pub async fn acquire(&self, workspace: &Path, variant: Option<&str>) -> Result<SkeletonWorkspace> {
        let attempts = self.options.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.acquire_once(workspace, variant).await {
                Ok(()) => break,
                Err(e) if attempt < attempts => {
                    let delay = self.options.backoff * attempt;
                    warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "skeleton acquisition failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        strip_vcs_metadata(workspace).await.map_err(|e| self.error(format!(
            "failed to remove .git from {}: {}",
            workspace.display(),
            e
        )))?;

        info!(source = %self.source.describe(), workspace = %workspace.display(), "skeleton acquired");
        Ok(SkeletonWorkspace {
            root: workspace.to_path_buf(),
        })
    }

    async fn acquire_once(&self, workspace: &Path, variant: Option<&str>) -> Result<()> {
        clear_path(workspace).await.map_err(|e| {
            self.error(format!("failed to clear {}: {}", workspace.display(), e))
        })?;
        if let Some(parent) = workspace.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                self.error(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        match &self.source {
            SkeletonSource::Remote(remote) => self.clone_remote(remote, workspace, variant).await,
            SkeletonSource::Local(path) => {
                if let Some(v) = variant {
                    warn!(variant = v, "variant is ignored for local skeletons");
                }
                copy_tree(path, workspace).map_err(|e| self.error(e))
            }
        }
    }

    async fn clone_remote(&self, remote: &str, workspace: &Path, variant: Option<&str>) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg("--quiet");
        if let Some(branch) = variant {
            cmd.arg("--branch").arg(branch);
        }
        cmd.arg("--")
            .arg(remote)
            .arg(workspace)
            // Fail instead of waiting on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(remote, variant = ?variant, "running git clone");

        let child = cmd
            .spawn()
            .map_err(|e| self.error(format!("failed to run git: {}", e)))?;

        let output = match timeout(self.options.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(self.error(format!("failed to wait for git: {}", e))),
            Err(_) => {
                return Err(self.error(format!(
                    "clone timed out after {} seconds",
                    self.options.timeout.as_secs()
                )))
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(self.error(format!(
                "git clone exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr
            )))
        }
    }

    fn error(&self, reason: String) -> ScaffoldError {
        ScaffoldError::Acquisition {
            source_ref: self.source.describe(),
            reason,
        }
    }
}

/// Remove a file or directory tree if present
async fn clear_path(path: &Path) -> std::io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Drop the repository's own `.git` (directory, or gitfile for worktrees)
async fn strip_vcs_metadata(workspace: &Path) -> std::io::Result<()> {
    clear_path(&workspace.join(".git")).await
}

fn copy_tree(from: &Path, to: &Path) -> std::result::Result<(), String> {
    if !from.is_dir() {
        return Err(format!("skeleton directory not found: {}", from.display()));
    }

    for entry in WalkDir::new(from).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_unresolvable_link(&e) => {
                warn!(path = ?e.path(), error = %e, "skipping unresolvable symlink");
                continue;
            }
            Err(e) => return Err(format!("failed to read skeleton tree: {}", e)),
        };
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| format!("unexpected path {}: {}", entry.path().display(), e))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| format!("failed to create {}: {}", target.display(), e))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| format!("failed to copy {}: {}", entry.path().display(), e))?;
        }
    }

    Ok(())
}
