//! Task definitions for the pipeline

use crate::config::Configuration;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// The work a task performs
#[async_trait]
pub trait TaskAction: Send {
    async fn run(&mut self, config: &Configuration) -> Result<()>;
}

/// Inclusion predicate, evaluated once when the pipeline is built
pub type Predicate = Box<dyn Fn(&Configuration) -> bool + Send + Sync>;

/// Lifecycle of a task within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    /// Excluded by its predicate; satisfies dependents like `Completed`
    Skipped,
    Running,
    Completed,
    Failed { cause: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Skipped | TaskState::Completed | TaskState::Failed { .. }
        )
    }

    /// Dependents may start once every dependency is satisfied
    pub fn is_satisfied(&self) -> bool {
        matches!(self, TaskState::Skipped | TaskState::Completed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Skipped => write!(f, "skipped"),
            TaskState::Running => write!(f, "running"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed { cause } => write!(f, "failed: {}", cause),
        }
    }
}

/// A named unit of work with dependencies and an optional inclusion predicate
pub struct Task {
    pub(crate) name: String,
    pub(crate) depends_on: Vec<String>,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) action: Box<dyn TaskAction>,
}

impl Task {
    pub fn new(name: impl Into<String>, action: impl TaskAction + 'static) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            predicate: None,
            action: Box::new(action),
        }
    }

    /// Require `task` to be completed or skipped before this one starts
    pub fn depends_on(mut self, task: impl Into<String>) -> Self {
        self.depends_on.push(task.into());
        self
    }

    /// Include this task only when `predicate` holds for the configuration
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Configuration) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("conditional", &self.predicate.is_some())
            .finish()
    }
}
