//! Collaborators invoked after materialization
//!
//! - Dependency installation via the package managers the project declares
//! - Version-control initialization

pub mod install;
pub mod vcs;

pub use install::{DependencyInstaller, ManifestInstaller, PackageManager, PACKAGE_MANAGERS};
pub use vcs::{GitCli, VersionControl};
