//! Product configuration trait for CLI binaries
//!
//! The binary implements this trait to tell the core which skeleton it
//! generates from and how it presents itself.

use std::path::PathBuf;

/// Configuration trait for a skeleton-based generator
///
/// Each product defines:
/// - Product identity (name, display name)
/// - Skeleton repository URL and its environment override
/// - Post-generation instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for the workspace directory, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Default git URL of the skeleton repository
    fn default_skeleton_url(&self) -> &'static str;

    /// Environment variable name for overriding the skeleton URL
    fn skeleton_url_env(&self) -> &'static str;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, dest: &std::path::Path) -> Vec<String>;

    /// Fresh scratch directory for one run's skeleton clone.
    ///
    /// Each call reserves a new uniquely named directory under the system
    /// temp dir, so concurrent runs never share a workspace.
    fn workspace_dir(&self) -> std::io::Result<PathBuf> {
        tempfile::Builder::new()
            .prefix(&format!("{}-skeleton-", self.name()))
            .tempdir()
            .map(|dir| dir.keep())
    }
}
