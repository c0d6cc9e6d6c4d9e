//! Pipeline construction and execution
//!
//! A `Pipeline` is validated and ordered once, from the task list and the
//! configuration. The `Orchestrator` then runs it one task at a time in that
//! order, stopping at the first failure.

use super::task::{Task, TaskAction, TaskState};
use crate::config::Configuration;
use crate::error::{Result, ScaffoldError};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info};

struct PlannedTask {
    name: String,
    depends_on: Vec<usize>,
    included: bool,
    action: Box<dyn TaskAction>,
}

/// A validated task graph with a fixed execution order
pub struct Pipeline {
    tasks: Vec<PlannedTask>,
    order: Vec<usize>,
}

impl Pipeline {
    /// Validate `tasks` and evaluate every inclusion predicate against `config`.
    ///
    /// Fails on duplicate names, unknown dependencies and cycles. Ties in the
    /// topological order are broken by declaration order.
    pub fn build(tasks: Vec<Task>, config: &Configuration) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), i).is_some() {
                return Err(ScaffoldError::Pipeline(format!(
                    "task `{}` declared twice",
                    task.name
                )));
            }
        }

        let mut planned = Vec::with_capacity(tasks.len());
        for task in tasks {
            let mut depends_on = Vec::with_capacity(task.depends_on.len());
            for dep in &task.depends_on {
                let dep_idx = index.get(dep).copied().ok_or_else(|| {
                    ScaffoldError::Pipeline(format!(
                        "task `{}` depends on unknown task `{}`",
                        task.name, dep
                    ))
                })?;
                depends_on.push(dep_idx);
            }

            let included = task.predicate.as_ref().map_or(true, |p| p(config));
            planned.push(PlannedTask {
                name: task.name,
                depends_on,
                included,
                action: task.action,
            });
        }

        let order = topological_order(&planned)?;
        Ok(Self {
            tasks: planned,
            order,
        })
    }

    /// Task names in execution order
    pub fn order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.tasks[i].name.as_str()).collect()
    }

    /// Whether `task` passed its inclusion predicate
    pub fn is_included(&self, task: &str) -> Option<bool> {
        self.tasks.iter().find(|t| t.name == task).map(|t| t.included)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Kahn's algorithm, always taking the earliest-declared ready task
fn topological_order(tasks: &[PlannedTask]) -> Result<Vec<usize>> {
    let mut in_degree: Vec<usize> = tasks.iter().map(|t| t.depends_on.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (i, task) in tasks.iter().enumerate() {
        for &dep in &task.depends_on {
            dependents[dep].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < tasks.len() {
        let stuck: Vec<&str> = (0..tasks.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| tasks[i].name.as_str())
            .collect();
        return Err(ScaffoldError::Pipeline(format!(
            "dependency cycle among tasks: {}",
            stuck.join(", ")
        )));
    }

    Ok(order)
}

/// Progress notifications emitted while a pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started { task: String },
    Completed { task: String },
    Skipped { task: String },
    Failed { task: String, cause: String },
    /// Emitted exactly once, after the last task
    Finished { succeeded: bool },
}

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub name: String,
    pub state: TaskState,
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
    failure: Option<ScaffoldError>,
}

impl RunReport {
    pub fn state(&self, task: &str) -> Option<&TaskState> {
        self.outcomes.iter().find(|o| o.name == task).map(|o| &o.state)
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// The first failure of the run, wrapped with its task name
    pub fn failure(&self) -> Option<&ScaffoldError> {
        self.failure.as_ref()
    }

    pub fn into_result(self) -> Result<Vec<TaskOutcome>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.outcomes),
        }
    }
}

type Observer<'a> = Box<dyn FnMut(&TaskEvent) + Send + 'a>;

/// Runs pipelines sequentially in dependency order
#[derive(Default)]
pub struct Orchestrator<'a> {
    observer: Option<Observer<'a>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new() -> Self {
        Self { observer: None }
    }

    /// Receive a [`TaskEvent`] for every state change
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&TaskEvent) + Send + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    fn emit(&mut self, event: TaskEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    /// Run every task of `pipeline`.
    ///
    /// A task starts only once all its dependencies are completed or skipped.
    /// The first failure marks every transitive dependent failed, and no
    /// further task is started.
    pub async fn run(&mut self, pipeline: Pipeline, config: &Configuration) -> RunReport {
        let Pipeline { mut tasks, order } = pipeline;
        let mut states: Vec<TaskState> = vec![TaskState::Pending; tasks.len()];
        let mut failure: Option<ScaffoldError> = None;

        for &idx in &order {
            if states[idx] != TaskState::Pending {
                continue;
            }
            let name = tasks[idx].name.clone();

            if !tasks[idx].included {
                debug!(task = %name, "task excluded by configuration");
                states[idx] = TaskState::Skipped;
                self.emit(TaskEvent::Skipped { task: name });
                continue;
            }

            debug_assert!(
                tasks[idx].depends_on.iter().all(|&d| states[d].is_satisfied()),
                "task started before its dependencies"
            );

            info!(task = %name, "starting task");
            states[idx] = TaskState::Running;
            self.emit(TaskEvent::Started { task: name.clone() });

            match tasks[idx].action.run(config).await {
                Ok(()) => {
                    info!(task = %name, "task completed");
                    states[idx] = TaskState::Completed;
                    self.emit(TaskEvent::Completed { task: name });
                }
                Err(e) => {
                    error!(task = %name, error = %e, "task failed");
                    let cause = e.to_string();
                    states[idx] = TaskState::Failed {
                        cause: cause.clone(),
                    };
                    self.emit(TaskEvent::Failed {
                        task: name.clone(),
                        cause,
                    });

                    for dependent in transitive_dependents(&tasks, idx) {
                        let dep_cause = format!("dependency `{}` failed", name);
                        states[dependent] = TaskState::Failed {
                            cause: dep_cause.clone(),
                        };
                        self.emit(TaskEvent::Failed {
                            task: tasks[dependent].name.clone(),
                            cause: dep_cause,
                        });
                    }

                    failure = Some(ScaffoldError::TaskFailed {
                        task: name,
                        source: Box::new(e),
                    });
                    break;
                }
            }
        }

        self.emit(TaskEvent::Finished {
            succeeded: failure.is_none(),
        });

        let outcomes = order
            .iter()
            .map(|&i| TaskOutcome {
                name: std::mem::take(&mut tasks[i].name),
                state: states[i].clone(),
            })
            .collect();

        RunReport { outcomes, failure }
    }
}

/// Every task that depends on `root`, directly or indirectly
fn transitive_dependents(tasks: &[PlannedTask], root: usize) -> Vec<usize> {
    let mut found = BTreeSet::new();
    let mut frontier = vec![root];

    while let Some(current) = frontier.pop() {
        for (i, task) in tasks.iter().enumerate() {
            if task.depends_on.contains(&current) && found.insert(i) {
                frontier.push(i);
            }
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records its name when run and optionally fails
    struct Scripted {
        name: &'static str,
        log: Log,
        fail: bool,
    }

    #[async_trait]
    impl TaskAction for Scripted {
        async fn run(&mut self, _config: &Configuration) -> Result<()> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.fail {
                Err(ScaffoldError::Install(format!("{} broke", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn scripted(name: &'static str, log: &Log) -> Task {
        Task::new(
            name,
            Scripted {
                name,
                log: log.clone(),
                fail: false,
            },
        )
    }

    fn failing(name: &'static str, log: &Log) -> Task {
        Task::new(
            name,
            Scripted {
                name,
                log: log.clone(),
                fail: true,
            },
        )
    }

    fn config() -> Configuration {
        Configuration::from_human_name("My Site")
    }

    #[test]
    fn test_order_respects_dependencies_and_declaration() {
        let log = Log::default();
        let pipeline = Pipeline::build(
            vec![
                scripted("git-init", &log).depends_on("build"),
                scripted("build", &log).depends_on("clone"),
                scripted("install", &log).depends_on("build"),
                scripted("clone", &log),
            ],
            &config(),
        )
        .unwrap();

        assert_eq!(pipeline.order(), vec!["clone", "build", "git-init", "install"]);
    }

    #[test]
    fn test_rejects_cycles_unknown_and_duplicates() {
        let log = Log::default();

        let cycle = Pipeline::build(
            vec![
                scripted("a", &log).depends_on("c"),
                scripted("b", &log).depends_on("a"),
                scripted("c", &log).depends_on("b"),
                scripted("d", &log),
            ],
            &config(),
        );
        assert!(matches!(cycle, Err(ScaffoldError::Pipeline(ref m)) if m.ends_with("cycle among tasks: a, b, c")));

        let unknown = Pipeline::build(vec![scripted("a", &log).depends_on("ghost")], &config());
        assert!(matches!(unknown, Err(ScaffoldError::Pipeline(ref m)) if m.contains("ghost")));

        let dup = Pipeline::build(vec![scripted("a", &log), scripted("a", &log)], &config());
        assert!(matches!(dup, Err(ScaffoldError::Pipeline(_))));

        let selfdep = Pipeline::build(vec![scripted("a", &log).depends_on("a")], &config());
        assert!(selfdep.is_err());
    }

    #[tokio::test]
    async fn test_dependencies_finish_before_dependents_start() {
        // Diamond plus a tail: every start must come after all its deps.
        let log = Log::default();
        let tasks = vec![
            scripted("d", &log).depends_on("b").depends_on("c"),
            scripted("c", &log).depends_on("a"),
            scripted("b", &log).depends_on("a"),
            scripted("e", &log).depends_on("d"),
            scripted("a", &log),
        ];
        let edges = [("d", "b"), ("d", "c"), ("c", "a"), ("b", "a"), ("e", "d")];

        let pipeline = Pipeline::build(tasks, &config()).unwrap();
        let report = Orchestrator::new().run(pipeline, &config()).await;
        assert!(report.succeeded());

        let ran = log.lock().unwrap().clone();
        assert_eq!(ran.len(), 5);
        let pos = |n: &str| ran.iter().position(|r| r == n).unwrap();
        for (task, dep) in edges {
            assert!(pos(dep) < pos(task), "{} ran before {}", task, dep);
        }
    }

    #[tokio::test]
    async fn test_excluded_task_is_skipped_and_unblocks_dependents() {
        let log = Log::default();
        let tasks = vec![
            scripted("clone", &log),
            scripted("git-init", &log)
                .depends_on("clone")
                .when(|c: &Configuration| c.git_init),
            scripted("announce", &log).depends_on("git-init"),
        ];

        let pipeline = Pipeline::build(tasks, &config()).unwrap();
        assert_eq!(pipeline.is_included("git-init"), Some(false));

        let report = Orchestrator::new().run(pipeline, &config()).await;
        assert!(report.succeeded());
        assert_eq!(report.state("git-init"), Some(&TaskState::Skipped));
        assert_eq!(report.state("announce"), Some(&TaskState::Completed));
        assert_eq!(*log.lock().unwrap(), vec!["clone", "announce"]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_stops_run() {
        let log = Log::default();
        let tasks = vec![
            failing("clone", &log),
            scripted("build", &log).depends_on("clone"),
            scripted("git-init", &log).depends_on("build"),
            scripted("unrelated", &log),
        ];

        let pipeline = Pipeline::build(tasks, &config()).unwrap();
        let report = Orchestrator::new().run(pipeline, &config()).await;

        assert!(!report.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["clone"]);
        assert!(matches!(report.state("clone"), Some(TaskState::Failed { .. })));
        assert_eq!(
            report.state("build"),
            Some(&TaskState::Failed {
                cause: "dependency `clone` failed".to_string()
            })
        );
        assert!(matches!(report.state("git-init"), Some(TaskState::Failed { .. })));
        assert_eq!(report.state("unrelated"), Some(&TaskState::Pending));

        let err = report.into_result().unwrap_err();
        assert_eq!(err.task(), Some("clone"));
        assert!(matches!(err.root_cause(), ScaffoldError::Install(_)));
    }

    #[tokio::test]
    async fn test_events_and_single_finish() {
        let log = Log::default();
        let events: Arc<Mutex<Vec<TaskEvent>>> = Arc::default();
        let sink = events.clone();

        let tasks = vec![
            scripted("clone", &log),
            scripted("install", &log).depends_on("clone").when(|_: &Configuration| false),
        ];
        let pipeline = Pipeline::build(tasks, &config()).unwrap();
        Orchestrator::new()
            .on_event(move |e| sink.lock().unwrap().push(e.clone()))
            .run(pipeline, &config())
            .await;

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TaskEvent::Started { task: "clone".to_string() },
                TaskEvent::Completed { task: "clone".to_string() },
                TaskEvent::Skipped { task: "install".to_string() },
                TaskEvent::Finished { succeeded: true },
            ]
        );
    }
}
