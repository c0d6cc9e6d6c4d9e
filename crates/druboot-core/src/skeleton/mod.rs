//! Skeleton acquisition, substitution, and materialization
//!
//! This module provides:
//! - Skeleton fetching from a git remote or local directory
//! - Placeholder token substitution
//! - Conflict resolution against an existing destination
//! - Writing the substituted tree into the destination

pub mod acquire;
pub mod conflict;
pub mod materialize;
pub mod placeholder;

pub use acquire::{AcquireOptions, SkeletonFetcher, SkeletonSource, SkeletonWorkspace};
pub use conflict::{Conflict, ConflictPolicy, ConflictResolver, FixedPolicy, Resolution, WriteAction};
pub use materialize::{materialize, MaterializeReport};
pub use placeholder::{substitute, Bindings, Placeholder, PlaceholderMap};
