//! Interactive conflict policy backed by a cliclack select prompt

use crate::error::{Result, ScaffoldError};
use crate::skeleton::{Conflict, ConflictPolicy, Resolution};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Asks the user about each conflicting file.
///
/// "Overwrite all" and "Skip all" answer every later conflict of the run
/// without asking again.
pub struct InteractivePolicy {
    dest: PathBuf,
    sticky: Option<Resolution>,
}

impl InteractivePolicy {
    pub fn new(dest: PathBuf) -> Self {
        Self { dest, sticky: None }
    }

    fn display_path<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.dest).unwrap_or(path).display()
    }
}

impl ConflictPolicy for InteractivePolicy {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Result<Resolution> {
        if let Some(resolution) = self.sticky {
            return Ok(resolution);
        }

        let prompt = format!("{} already exists", self.display_path(conflict.path));
        let to_error = |e: std::io::Error| ScaffoldError::Materialization {
            path: conflict.path.to_path_buf(),
            source: e,
        };

        loop {
            let choice = cliclack::select(prompt.as_str())
                .item("overwrite", "Overwrite", "")
                .item("skip", "Skip", "keep the existing file")
                .item("suffix", "Write alongside", "as <name>.N")
                .item("overwrite-all", "Overwrite this and all others", "")
                .item("skip-all", "Skip this and all others", "")
                .item("diff", "Show differences", "")
                .item("abort", "Abort", "stop generating files")
                .interact();

            let choice: &str = match choice {
                Ok(c) => c,
                // Esc / Ctrl+C at the prompt ends the run like an abort
                Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(Resolution::AbortAll),
                Err(e) => return Err(to_error(e)),
            };

            let resolution = match choice {
                "overwrite" => Resolution::Overwrite,
                "skip" => Resolution::Skip,
                "suffix" => Resolution::WriteWithSuffix,
                "overwrite-all" => {
                    self.sticky = Some(Resolution::Overwrite);
                    Resolution::Overwrite
                }
                "skip-all" => {
                    self.sticky = Some(Resolution::Skip);
                    Resolution::Skip
                }
                "diff" => {
                    cliclack::log::info(summarize(conflict.existing, conflict.incoming))
                        .map_err(to_error)?;
                    continue;
                }
                _ => Resolution::AbortAll,
            };
            return Ok(resolution);
        }
    }
}

/// Short description of how two versions of a file differ
pub fn summarize(existing: &[u8], incoming: &[u8]) -> String {
    let mut summary = format!(
        "existing: {} lines, {} bytes\nincoming: {} lines, {} bytes",
        line_count(existing),
        existing.len(),
        line_count(incoming),
        incoming.len()
    );

    match (std::str::from_utf8(existing), std::str::from_utf8(incoming)) {
        (Ok(old), Ok(new)) => {
            let first_diff = old
                .lines()
                .zip(new.lines())
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| old.lines().count().min(new.lines().count()));
            let old_line = old.lines().nth(first_diff).unwrap_or("<end of file>");
            let new_line = new.lines().nth(first_diff).unwrap_or("<end of file>");
            summary.push_str(&format!(
                "\nfirst difference at line {}:\n- {}\n+ {}",
                first_diff + 1,
                old_line,
                new_line
            ));
        }
        _ => summary.push_str("\nbinary content"),
    }

    summary
}

fn line_count(content: &[u8]) -> usize {
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    if content.last().is_some_and(|&b| b != b'\n') {
        newlines + 1
    } else {
        newlines
    }
}
