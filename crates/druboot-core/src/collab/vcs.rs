//! Version-control initialization of the generated project

use crate::error::{Result, ScaffoldError};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Initializes a repository at the project root
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Create a repository at `dest`, registering `remote` as `origin` if given
    async fn init(&self, dest: &Path, remote: Option<&str>) -> Result<()>;
}

/// Shells out to the `git` binary
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    /// Run a git command in `cwd`, returning trimmed stdout
    pub async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(cwd)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                ScaffoldError::VersionControl(format!(
                    "failed to execute git {}: {}",
                    args.first().unwrap_or(&""),
                    e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ScaffoldError::VersionControl(format!(
                "git {} failed (exit code {}): {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                if stderr.is_empty() { stdout } else { stderr }
            )))
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn init(&self, dest: &Path, remote: Option<&str>) -> Result<()> {
        self.run(dest, &["init", "--quiet"]).await?;
        info!(dest = %dest.display(), "initialized git repository");

        if let Some(url) = remote {
            self.run(dest, &["remote", "add", "origin", url]).await?;
            info!(remote = url, "registered origin");
        }
        Ok(())
    }
}
