//! Task orchestration
//!
//! - `task`: task definitions, states and inclusion predicates
//! - `orchestrator`: graph validation, ordering and sequential execution
//! - `stages`: the standard clone/build/install/git-init graph

pub mod orchestrator;
pub mod stages;
pub mod task;

pub use orchestrator::{Orchestrator, Pipeline, RunReport, TaskEvent, TaskOutcome};
pub use stages::{standard_pipeline, BuildReport, Collaborators};
pub use task::{Predicate, Task, TaskAction, TaskState};
