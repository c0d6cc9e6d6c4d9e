//! Dependency installation inside the generated project
//!
//! The generated project is inspected for package-manager manifests at its
//! root; each manifest found triggers the matching install command. Output is
//! streamed to the terminal as it arrives.

use crate::error::{Result, ScaffoldError};
use async_trait::async_trait;
use colored::Colorize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::info;

/// Timeout for a single install command (15 minutes)
const INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// Installs a generated project's dependencies
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    /// Install into `dest`; returns the commands that ran
    async fn install(&self, dest: &Path) -> Result<Vec<String>>;
}

/// A manifest file and the command that installs what it lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManager {
    pub manifest: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl PackageManager {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program)
            .chain(self.args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Package managers checked, in the order they run
pub const PACKAGE_MANAGERS: &[PackageManager] = &[
    PackageManager {
        manifest: "package.json",
        program: "npm",
        args: &["install"],
    },
    PackageManager {
        manifest: "bower.json",
        program: "bower",
        args: &["install", "--config.interactive=false"],
    },
    PackageManager {
        manifest: "composer.json",
        program: "composer",
        args: &["install"],
    },
    PackageManager {
        manifest: "requirements.txt",
        program: "pip",
        args: &["install", "-r", "requirements.txt"],
    },
];

/// Runs the install command of every manifest present at the project root
#[derive(Debug, Clone)]
pub struct ManifestInstaller {
    managers: Vec<PackageManager>,
    timeout: Duration,
    echo: bool,
}

impl Default for ManifestInstaller {
    fn default() -> Self {
        Self::new(PACKAGE_MANAGERS.to_vec())
    }
}

impl ManifestInstaller {
    pub fn new(managers: Vec<PackageManager>) -> Self {
        Self {
            managers,
            timeout: INSTALL_TIMEOUT,
            echo: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stream command output to the terminal (on by default)
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Package managers whose manifest exists in `dest`
    pub fn detect(&self, dest: &Path) -> Vec<PackageManager> {
        self.managers
            .iter()
            .filter(|m| dest.join(m.manifest).is_file())
            .copied()
            .collect()
    }

    async fn run(&self, manager: &PackageManager, dest: &Path) -> Result<()> {
        let cmd = manager.command_line();
        if self.echo {
            println!();
            println!("{} {}", "Running:".dimmed(), cmd.yellow());
            println!();
        }

        let mut child = Command::new(manager.program)
            .args(manager.args)
            .current_dir(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScaffoldError::Install(format!("failed to run {}: {}", cmd, e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = self.echo;

        let output_task = async move {
            let mut stdout_lines = stdout.map(|s| BufReader::new(s).lines());
            let mut stderr_lines = stderr.map(|s| BufReader::new(s).lines());

            while stdout_lines.is_some() || stderr_lines.is_some() {
                tokio::select! {
                    line = next_line(&mut stdout_lines), if stdout_lines.is_some() => match line {
                        Some(line) if echo => println!("  {}", line),
                        Some(_) => {}
                        None => stdout_lines = None,
                    },
                    line = next_line(&mut stderr_lines), if stderr_lines.is_some() => match line {
                        Some(line) if echo => eprintln!("  {}", line.yellow()),
                        Some(_) => {}
                        None => stderr_lines = None,
                    },
                }
            }

            child.wait().await
        };

        match timeout(self.timeout, output_task).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(ScaffoldError::Install(format!(
                "`{}` failed with exit code {}",
                cmd,
                status.code().unwrap_or(-1)
            ))),
            Ok(Err(e)) => Err(ScaffoldError::Install(format!("failed to wait for {}: {}", cmd, e))),
            Err(_) => Err(ScaffoldError::Install(format!(
                "`{}` timed out after {} seconds",
                cmd,
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Next line from an optional reader; `None` on EOF or read error
async fn next_line<R>(lines: &mut Option<tokio::io::Lines<BufReader<R>>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(reader) => reader.next_line().await.ok().flatten(),
        None => None,
    }
}

#[async_trait]
impl DependencyInstaller for ManifestInstaller {
    async fn install(&self, dest: &Path) -> Result<Vec<String>> {
        let managers = self.detect(dest);
        if managers.is_empty() {
            info!(dest = %dest.display(), "no package manifests found, nothing to install");
        }

        let mut ran = Vec::with_capacity(managers.len());
        for manager in &managers {
            info!(command = %manager.command_line(), "installing dependencies");
            self.run(manager, dest).await?;
            ran.push(manager.command_line());
        }
        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_follows_manager_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("composer.json"), "{}").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let detected: Vec<_> = ManifestInstaller::default()
            .detect(dir.path())
            .iter()
            .map(|m| m.program)
            .collect();
        assert_eq!(detected, vec!["npm", "composer"]);
    }

    #[tokio::test]
    async fn test_no_manifest_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let ran = ManifestInstaller::default().install(dir.path()).await.unwrap();
        assert!(ran.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command_in_project_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Makefile"), "").unwrap();

        let installer = ManifestInstaller::new(vec![PackageManager {
            manifest: "Makefile",
            program: "sh",
            args: &["-c", "touch installed.marker"],
        }])
        .echo(false);

        let ran = installer.install(dir.path()).await.unwrap();
        assert_eq!(ran, vec!["sh -c touch installed.marker".to_string()]);
        assert!(dir.path().join("installed.marker").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_install_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Makefile"), "").unwrap();

        let installer = ManifestInstaller::new(vec![PackageManager {
            manifest: "Makefile",
            program: "sh",
            args: &["-c", "echo broken >&2; exit 3"],
        }])
        .echo(false);

        let err = installer.install(dir.path()).await.unwrap_err();
        assert!(matches!(err, ScaffoldError::Install(ref msg) if msg.contains("exit code 3")));
    }
}
