//! The druboot task graph: clone, build, install, git-init

use super::orchestrator::Pipeline;
use super::task::{Task, TaskAction};
use crate::collab::{DependencyInstaller, VersionControl};
use crate::config::Configuration;
use crate::error::{Result, ScaffoldError};
use crate::skeleton::{
    materialize, Bindings, ConflictPolicy, ConflictResolver, MaterializeReport, PlaceholderMap,
    SkeletonFetcher,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const CLONE: &str = "clone";
pub const BUILD: &str = "build";
pub const INSTALL: &str = "install";
pub const GIT_INIT: &str = "git-init";

/// Everything the standard stages need besides the configuration
pub struct Collaborators<P> {
    pub fetcher: SkeletonFetcher,
    /// Scratch directory the skeleton is cloned into
    pub workspace: PathBuf,
    pub placeholders: PlaceholderMap,
    pub policy: P,
    pub installer: Box<dyn DependencyInstaller>,
    pub vcs: Box<dyn VersionControl>,
    /// Leave the workspace on disk after a successful build
    pub keep_workspace: bool,
}

/// Shared slot the build stage fills with its report
#[derive(Debug, Clone, Default)]
pub struct BuildReport(Arc<Mutex<Option<MaterializeReport>>>);

impl BuildReport {
    pub fn take(&self) -> Option<MaterializeReport> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }

    fn store(&self, report: MaterializeReport) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(report);
        }
    }
}

/// Build the standard pipeline for `config`.
///
/// Placeholder bindings are resolved here, so a configuration that cannot be
/// substituted fails before anything is cloned.
pub fn standard_pipeline<P>(
    config: &Configuration,
    collaborators: Collaborators<P>,
) -> Result<(Pipeline, BuildReport)>
where
    P: ConflictPolicy + 'static,
{
    let Collaborators {
        fetcher,
        workspace,
        placeholders,
        policy,
        installer,
        vcs,
        keep_workspace,
    } = collaborators;

    let bindings = placeholders.bindings(config)?;
    let report = BuildReport::default();

    let tasks = vec![
        Task::new(
            CLONE,
            CloneStage {
                fetcher,
                workspace: workspace.clone(),
            },
        ),
        Task::new(
            BUILD,
            BuildStage {
                workspace,
                bindings,
                resolver: ConflictResolver::new(policy),
                keep_workspace,
                report: report.clone(),
            },
        )
        .depends_on(CLONE),
        Task::new(INSTALL, InstallStage { installer })
            .depends_on(BUILD)
            .when(|c: &Configuration| c.install_dependencies),
        Task::new(GIT_INIT, GitInitStage { vcs })
            .depends_on(BUILD)
            .when(|c: &Configuration| c.git_init),
    ];

    Ok((Pipeline::build(tasks, config)?, report))
}

struct CloneStage {
    fetcher: SkeletonFetcher,
    workspace: PathBuf,
}

#[async_trait]
impl TaskAction for CloneStage {
    async fn run(&mut self, config: &Configuration) -> Result<()> {
        self.fetcher
            .acquire(&self.workspace, config.variant.as_deref())
            .await
            .map(|_| ())
    }
}

struct BuildStage<P> {
    workspace: PathBuf,
    bindings: Bindings,
    resolver: ConflictResolver<P>,
    keep_workspace: bool,
    report: BuildReport,
}

#[async_trait]
impl<P: ConflictPolicy> TaskAction for BuildStage<P> {
    async fn run(&mut self, config: &Configuration) -> Result<()> {
        if !self.workspace.is_dir() {
            return Err(ScaffoldError::Materialization {
                path: self.workspace.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "skeleton workspace is missing",
                ),
            });
        }

        let report = materialize(&self.workspace, &self.bindings, &config.dest, &mut self.resolver).await?;
        info!(
            dest = %config.dest.display(),
            written = report.written(),
            skipped = report.skipped.len(),
            unchanged = report.unchanged.len(),
            "skeleton materialized"
        );
        self.report.store(report);

        if !self.keep_workspace {
            if let Err(e) = tokio::fs::remove_dir_all(&self.workspace).await {
                warn!(workspace = %self.workspace.display(), error = %e, "failed to remove workspace");
            }
        }
        Ok(())
    }
}

struct InstallStage {
    installer: Box<dyn DependencyInstaller>,
}

#[async_trait]
impl TaskAction for InstallStage {
    async fn run(&mut self, config: &Configuration) -> Result<()> {
        self.installer.install(&config.dest).await.map(|_| ())
    }
}

struct GitInitStage {
    vcs: Box<dyn VersionControl>,
}

#[async_trait]
impl TaskAction for GitInitStage {
    async fn run(&mut self, config: &Configuration) -> Result<()> {
        self.vcs.init(&config.dest, config.remote()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Orchestrator, TaskState};
    use crate::skeleton::{FixedPolicy, Resolution, SkeletonSource};
    use std::path::Path;
    use tempfile::TempDir;

    /// Records the destination it was asked to handle
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(PathBuf, Option<String>)>>>);

    #[async_trait]
    impl DependencyInstaller for Recorder {
        async fn install(&self, dest: &Path) -> Result<Vec<String>> {
            self.0.lock().unwrap().push((dest.to_path_buf(), None));
            Ok(vec![])
        }
    }

    #[async_trait]
    impl VersionControl for Recorder {
        async fn init(&self, dest: &Path, remote: Option<&str>) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((dest.to_path_buf(), remote.map(str::to_string)));
            Ok(())
        }
    }

    fn setup(config: &Configuration, skeleton: &Path, scratch: &Path) -> (Pipeline, BuildReport, Recorder, Recorder) {
        let installs = Recorder::default();
        let inits = Recorder::default();
        let (pipeline, report) = standard_pipeline(
            config,
            Collaborators {
                fetcher: SkeletonFetcher::new(SkeletonSource::local(skeleton.to_path_buf())),
                workspace: scratch.join("workspace"),
                placeholders: PlaceholderMap::default(),
                policy: FixedPolicy(Resolution::Skip),
                installer: Box::new(installs.clone()),
                vcs: Box::new(inits.clone()),
                keep_workspace: false,
            },
        )
        .unwrap();
        (pipeline, report, installs, inits)
    }

    fn skeleton() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# ***DRUPAL_HUMAN_NAME***\n").unwrap();
        dir
    }

    #[test]
    fn test_pipeline_shape() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.install_dependencies = false;

        let (pipeline, _, _, _) = setup(&config, skel.path(), scratch.path());
        assert_eq!(pipeline.order(), vec![CLONE, BUILD, INSTALL, GIT_INIT]);
        assert_eq!(pipeline.is_included(INSTALL), Some(false));
        assert_eq!(pipeline.is_included(GIT_INIT), Some(false));
    }

    #[tokio::test]
    async fn test_runs_all_included_stages() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");
        config.git_init = true;
        config.git_remote = Some("https://example.com/mysite.git".to_string());

        let (pipeline, report, installs, inits) = setup(&config, skel.path(), scratch.path());
        let run = Orchestrator::new().run(pipeline, &config).await;
        assert!(run.succeeded(), "{:?}", run.failure());

        assert_eq!(
            std::fs::read_to_string(config.dest.join("README.md")).unwrap(),
            "# My Site\n"
        );
        assert_eq!(report.take().unwrap().created, vec![PathBuf::from("README.md")]);
        assert_eq!(installs.0.lock().unwrap().len(), 1);
        assert_eq!(
            *inits.0.lock().unwrap(),
            vec![(config.dest.clone(), Some("https://example.com/mysite.git".to_string()))]
        );
        assert!(!scratch.path().join("workspace").exists());
    }

    #[tokio::test]
    async fn test_clone_failure_blocks_build() {
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");

        let (pipeline, report, installs, _) =
            setup(&config, &scratch.path().join("no-skeleton"), scratch.path());
        let run = Orchestrator::new().run(pipeline, &config).await;

        assert!(!run.succeeded());
        assert!(matches!(run.state(BUILD), Some(TaskState::Failed { .. })));
        assert!(!config.dest.exists());
        assert!(report.take().is_none());
        assert!(installs.0.lock().unwrap().is_empty());
        let err = run.into_result().unwrap_err();
        assert_eq!(err.task(), Some(CLONE));
    }

    #[test]
    fn test_bad_bindings_fail_before_running() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.human_name = String::new();

        let result = standard_pipeline(
            &config,
            Collaborators {
                fetcher: SkeletonFetcher::new(SkeletonSource::local(skel.path().to_path_buf())),
                workspace: scratch.path().join("workspace"),
                placeholders: PlaceholderMap::default(),
                policy: FixedPolicy(Resolution::Skip),
                installer: Box::new(Recorder::default()),
                vcs: Box::new(Recorder::default()),
                keep_workspace: false,
            },
        );
        assert!(matches!(result, Err(ScaffoldError::Substitution(_))));
    }

    fn real_git(skeleton: &Path, scratch: &Path, policy: Resolution) -> Collaborators<FixedPolicy> {
        Collaborators {
            fetcher: SkeletonFetcher::new(SkeletonSource::local(skeleton.to_path_buf())),
            workspace: scratch.join("workspace"),
            placeholders: PlaceholderMap::default(),
            policy: FixedPolicy(policy),
            installer: Box::new(Recorder::default()),
            vcs: Box::new(crate::collab::GitCli),
            keep_workspace: false,
        }
    }

    #[tokio::test]
    async fn test_generated_project_without_git_has_no_repository() {
        let skel = skeleton();
        std::fs::create_dir(skel.path().join(".git")).unwrap();
        std::fs::write(skel.path().join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");
        config.install_dependencies = false;

        let (pipeline, _) =
            standard_pipeline(&config, real_git(skel.path(), scratch.path(), Resolution::Skip))
                .unwrap();
        let run = Orchestrator::new().run(pipeline, &config).await;

        assert!(run.succeeded(), "{:?}", run.failure());
        assert_eq!(run.state(GIT_INIT), Some(&TaskState::Skipped));
        assert!(config.dest.join("README.md").is_file());
        assert!(!config.dest.join(".git").exists());
    }

    #[tokio::test]
    async fn test_generated_project_registers_origin() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");
        config.install_dependencies = false;
        config.git_init = true;
        config.git_remote = Some("git@example.com:team/mysite.git".to_string());

        let (pipeline, _) =
            standard_pipeline(&config, real_git(skel.path(), scratch.path(), Resolution::Skip))
                .unwrap();
        let run = Orchestrator::new().run(pipeline, &config).await;
        assert!(run.succeeded(), "{:?}", run.failure());

        let origin = crate::collab::GitCli
            .run(&config.dest, &["remote", "get-url", "origin"])
            .await
            .unwrap();
        assert_eq!(origin, "git@example.com:team/mysite.git");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_conflicting_file_and_keeps_the_rest() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");
        config.install_dependencies = false;
        std::fs::create_dir_all(&config.dest).unwrap();
        std::fs::write(config.dest.join("README.md"), "hand written\n").unwrap();
        std::fs::write(config.dest.join("notes.txt"), "mine\n").unwrap();

        let (pipeline, report) = standard_pipeline(
            &config,
            real_git(skel.path(), scratch.path(), Resolution::Overwrite),
        )
        .unwrap();
        let run = Orchestrator::new().run(pipeline, &config).await;
        assert!(run.succeeded(), "{:?}", run.failure());

        assert_eq!(
            std::fs::read_to_string(config.dest.join("README.md")).unwrap(),
            "# My Site\n"
        );
        assert_eq!(
            std::fs::read_to_string(config.dest.join("notes.txt")).unwrap(),
            "mine\n"
        );
        assert_eq!(
            report.take().unwrap().overwritten,
            vec![PathBuf::from("README.md")]
        );
    }

    #[tokio::test]
    async fn test_abort_fails_build_and_blocks_dependents() {
        let skel = skeleton();
        let scratch = TempDir::new().unwrap();
        let mut config = Configuration::from_human_name("My Site");
        config.dest = scratch.path().join("mysite");
        std::fs::create_dir_all(&config.dest).unwrap();
        std::fs::write(config.dest.join("README.md"), "hand written\n").unwrap();

        let (pipeline, _) = standard_pipeline(
            &config,
            real_git(skel.path(), scratch.path(), Resolution::AbortAll),
        )
        .unwrap();
        let run = Orchestrator::new().run(pipeline, &config).await;

        assert_eq!(run.state(CLONE), Some(&TaskState::Completed));
        assert!(matches!(run.state(INSTALL), Some(TaskState::Failed { .. })));
        let err = run.into_result().unwrap_err();
        assert_eq!(err.task(), Some(BUILD));
        assert!(matches!(err.root_cause(), ScaffoldError::ConflictAbort { .. }));
        assert_eq!(
            std::fs::read_to_string(config.dest.join("README.md")).unwrap(),
            "hand written\n"
        );
    }
}
