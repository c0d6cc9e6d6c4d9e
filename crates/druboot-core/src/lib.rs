//! Druboot Core - Library for generating projects from a skeleton repository
//!
//! This library clones a skeleton repository, replaces its placeholder tokens
//! with project-specific values, and writes the result into a destination
//! directory that may already contain files.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - Skeleton acquisition, placeholder substitution,
//!   conflict resolution, materialization
//! - **Layer 2: Workflow Orchestration** - `Pipeline` and `Orchestrator` running the
//!   clone/build/install/git-init task graph
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompts and interactive conflict policy
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use druboot_core::{pipeline, skeleton, collab, Configuration, Orchestrator};
//!
//! let config = Configuration::from_human_name("My Site");
//! let (pipeline, build) = pipeline::standard_pipeline(&config, pipeline::Collaborators {
//!     fetcher: skeleton::SkeletonFetcher::new(skeleton::SkeletonSource::from_config(&MyProduct)?),
//!     workspace: MyProduct.workspace_dir()?,
//!     placeholders: skeleton::PlaceholderMap::default(),
//!     policy: skeleton::FixedPolicy(skeleton::Resolution::Skip),
//!     installer: Box::new(collab::ManifestInstaller::default()),
//!     vcs: Box::new(collab::GitCli),
//!     keep_workspace: false,
//! })?;
//! Orchestrator::new().run(pipeline, &config).await.into_result()?;
//! ```

pub mod collab;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod product;
pub mod skeleton;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use config::Configuration;
pub use error::{Result, ScaffoldError, SubstitutionError};
pub use pipeline::{Orchestrator, Pipeline, RunReport, TaskEvent, TaskState};
pub use product::ProductConfig;
pub use skeleton::{
    ConflictPolicy, FixedPolicy, PlaceholderMap, Resolution, SkeletonFetcher, SkeletonSource,
};

#[cfg(feature = "tui")]
pub use tui::run;
