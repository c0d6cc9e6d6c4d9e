//! Materialization of an acquired skeleton into the destination tree

use crate::error::{Result, ScaffoldError};
use crate::skeleton::conflict::{ConflictPolicy, ConflictResolver, WriteAction};
use crate::skeleton::placeholder::{substitute, Bindings};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What happened to each skeleton file, by path relative to the destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub created: Vec<PathBuf>,
    pub overwritten: Vec<PathBuf>,
    /// (skeleton path, path actually written)
    pub suffixed: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

impl MaterializeReport {
    /// Files whose bytes were written during this run
    pub fn written(&self) -> usize {
        self.created.len() + self.overwritten.len() + self.suffixed.len()
    }

    /// Every skeleton file visited
    pub fn visited(&self) -> usize {
        self.written() + self.skipped.len() + self.unchanged.len()
    }
}

/// Write every file of `workspace` under `dest`, substituting placeholders and
/// routing existing files through `resolver`.
///
/// Directories are created as they are encountered, so empty skeleton
/// directories survive. An abort decision stops the walk; files written
/// before it stay.
pub async fn materialize<P: ConflictPolicy>(
    workspace: &Path,
    bindings: &Bindings,
    dest: &Path,
    resolver: &mut ConflictResolver<P>,
) -> Result<MaterializeReport> {
    fs::create_dir_all(dest).await.map_err(|e| io_error(dest, e))?;

    let mut report = MaterializeReport::default();

    let walker = WalkDir::new(workspace)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_unresolvable_link(&e) => {
                warn!(path = ?e.path(), error = %e, "skipping unresolvable symlink");
                continue;
            }
            Err(e) => {
                return Err(ScaffoldError::Materialization {
                    path: e.path().map(Path::to_path_buf).unwrap_or_else(|| workspace.to_path_buf()),
                    source: e.into(),
                })
            }
        };
        let relative = entry
            .path()
            .strip_prefix(workspace)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        let target = dest.join(&relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).await.map_err(|e| io_error(&target, e))?;
            continue;
        }

        let source = fs::read(entry.path()).await.map_err(|e| io_error(entry.path(), e))?;
        let content = substitute(&source, bindings);

        let action = resolver.resolve(&target, &content)?;
        debug!(path = %relative.display(), ?action, "resolved");

        let written_to = match action {
            WriteAction::Create => {
                report.created.push(relative);
                target
            }
            WriteAction::Overwrite => {
                report.overwritten.push(relative);
                target
            }
            WriteAction::Suffixed(path) => {
                let rebased = path.strip_prefix(dest).map(Path::to_path_buf).unwrap_or_else(|_| path.clone());
                report.suffixed.push((relative, rebased));
                path
            }
            WriteAction::Skip => {
                report.skipped.push(relative);
                continue;
            }
            WriteAction::Unchanged => {
                report.unchanged.push(relative);
                continue;
            }
            WriteAction::Abort => return Err(ScaffoldError::ConflictAbort { path: target }),
        };

        write_file(&written_to, &content).await?;
        copy_permissions(entry.path(), &written_to).await?;
    }

    Ok(report)
}

async fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| io_error(parent, e))?;
    }
    fs::write(path, content).await.map_err(|e| io_error(path, e))
}

#[cfg(unix)]
async fn copy_permissions(from: &Path, to: &Path) -> Result<()> {
    let perms = fs::metadata(from).await.map_err(|e| io_error(from, e))?.permissions();
    fs::set_permissions(to, perms).await.map_err(|e| io_error(to, e))
}

#[cfg(not(unix))]
async fn copy_permissions(_from: &Path, _to: &Path) -> Result<()> {
    Ok(())
}

/// A dangling symlink, or one that loops back to an ancestor directory
pub(crate) fn is_unresolvable_link(e: &walkdir::Error) -> bool {
    if e.loop_ancestor().is_some() {
        return true;
    }
    let missing = e
        .io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
    missing && e.path().is_some_and(Path::is_symlink)
}

fn io_error(path: &Path, source: std::io::Error) -> ScaffoldError {
    ScaffoldError::Materialization {
        path: path.to_path_buf(),
        source,
    }
}
