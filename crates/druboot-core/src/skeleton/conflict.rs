//! Conflict resolution for files that already exist at the destination
//!
//! The resolver owns the per-run memo of decisions; how a decision is
//! obtained is up to the [`ConflictPolicy`] it wraps.

use crate::error::{Result, ScaffoldError};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do with a conflicting destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the existing file
    Overwrite,
    /// Keep the existing file untouched
    Skip,
    /// Write the new content next to the existing file under a suffixed name
    WriteWithSuffix,
    /// Stop materializing; files already written stay
    AbortAll,
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Resolution::Overwrite),
            "skip" => Ok(Resolution::Skip),
            "suffix" | "write-with-suffix" => Ok(Resolution::WriteWithSuffix),
            "abort" => Ok(Resolution::AbortAll),
            other => Err(format!(
                "unknown conflict policy '{}' (expected overwrite, skip, suffix or abort)",
                other
            )),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resolution::Overwrite => "overwrite",
            Resolution::Skip => "skip",
            Resolution::WriteWithSuffix => "suffix",
            Resolution::AbortAll => "abort",
        };
        write!(f, "{}", s)
    }
}

/// A destination file whose content differs from what would be written
#[derive(Debug)]
pub struct Conflict<'a> {
    pub path: &'a Path,
    pub existing: &'a [u8],
    pub incoming: &'a [u8],
}

/// Source of conflict decisions (a prompt, a fixed rule, ...)
pub trait ConflictPolicy: Send {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Result<Resolution>;
}

/// Answers every conflict the same way, for non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub Resolution);

impl ConflictPolicy for FixedPolicy {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> Result<Resolution> {
        Ok(self.0)
    }
}

impl<P: ConflictPolicy + ?Sized> ConflictPolicy for Box<P> {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Result<Resolution> {
        (**self).decide(conflict)
    }
}

/// Outcome of resolving one destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    /// Nothing at the path; write it
    Create,
    /// Same bytes already there; nothing to do
    Unchanged,
    Overwrite,
    Skip,
    /// Write to this sibling path instead
    Suffixed(PathBuf),
    Abort,
}

/// Resolves destination paths, asking its policy at most once per path
pub struct ConflictResolver<P> {
    policy: P,
    decided: HashMap<PathBuf, Resolution>,
}

impl<P: ConflictPolicy> ConflictResolver<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            decided: HashMap::new(),
        }
    }

    /// Decide what to do with `incoming` at `dest`
    pub fn resolve(&mut self, dest: &Path, incoming: &[u8]) -> Result<WriteAction> {
        if !dest.exists() {
            return Ok(WriteAction::Create);
        }
        if !dest.is_file() {
            return Err(ScaffoldError::Materialization {
                path: dest.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "a directory or other non-file entry is in the way",
                ),
            });
        }

        let existing = std::fs::read(dest).map_err(|e| ScaffoldError::Materialization {
            path: dest.to_path_buf(),
            source: e,
        })?;
        if existing == incoming {
            return Ok(WriteAction::Unchanged);
        }

        let resolution = match self.decided.get(dest) {
            Some(r) => *r,
            None => {
                let r = self.policy.decide(&Conflict {
                    path: dest,
                    existing: &existing,
                    incoming,
                })?;
                self.decided.insert(dest.to_path_buf(), r);
                r
            }
        };

        Ok(match resolution {
            Resolution::Overwrite => WriteAction::Overwrite,
            Resolution::Skip => WriteAction::Skip,
            Resolution::WriteWithSuffix => WriteAction::Suffixed(suffixed_path(dest)),
            Resolution::AbortAll => WriteAction::Abort,
        })
    }

    /// Number of distinct paths a decision was requested for
    pub fn decisions(&self) -> usize {
        self.decided.len()
    }
}

/// First free `<name>.<n>` sibling of `path`, starting at 1
pub fn suffixed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    (1..)
        .map(|n| path.with_file_name(format!("{}.{}", name, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
