//! Charm-style CLI prompts using cliclack

use super::conflict::InteractivePolicy;
use crate::collab::{GitCli, ManifestInstaller};
use crate::config::{validate, Configuration};
use crate::pipeline::{self, stages, Collaborators, Orchestrator, TaskEvent};
use crate::product::ProductConfig;
use crate::skeleton::{
    AcquireOptions, ConflictPolicy, FixedPolicy, MaterializeReport, PlaceholderMap, Resolution,
    SkeletonFetcher, SkeletonSource,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// CLI arguments for the generate command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// YAML answers file used instead of the prompts
    pub answers: Option<PathBuf>,

    /// Local skeleton directory to use instead of cloning the remote
    pub skeleton_dir: Option<PathBuf>,

    /// Skeleton branch to clone
    pub variant: Option<String>,

    /// Fixed answer for every conflicting file
    pub on_conflict: Option<Resolution>,

    /// Skip dependency installation
    pub no_install: bool,

    /// Extra clone attempts after a failure
    pub retries: u32,

    /// Keep the cloned skeleton after generation
    pub keep_workspace: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the CLI with interactive prompts
pub async fn run<C: ProductConfig>(product: &C, args: CreateArgs) -> Result<()> {
    cliclack::intro(format!("Welcome to the {} generator!", product.display_name()))?;

    // Step 1: Collect the configuration
    let mut config = match &args.answers {
        Some(path) => {
            cliclack::log::info(format!("Using answers from {}", path.display()))?;
            Configuration::from_yaml_file(path)?
        }
        None => collect_configuration(&args)?,
    };
    if args.variant.is_some() {
        config.variant = args.variant.clone();
    }
    if args.no_install {
        config.install_dependencies = false;
    }
    config.validate()?;

    // Step 2: Warn about a non-empty destination
    check_destination(&config.dest, &args)?;

    // Step 3: Setup skeleton fetcher
    let fetcher = setup_fetcher(product, &args)?;

    // Step 4: Build and run the pipeline
    let workspace = product
        .workspace_dir()
        .context("Failed to create skeleton workspace")?;
    if args.keep_workspace {
        cliclack::log::info(format!("Skeleton workspace: {}", workspace.display()))?;
    }
    let policy = conflict_policy(&config, &args);
    let (pipeline, build) = pipeline::standard_pipeline(
        &config,
        Collaborators {
            fetcher,
            workspace,
            placeholders: PlaceholderMap::default(),
            policy,
            installer: Box::new(ManifestInstaller::default()),
            vcs: Box::new(GitCli),
            keep_workspace: args.keep_workspace,
        },
    )?;

    let report = Orchestrator::new()
        .on_event(log_event)
        .run(pipeline, &config)
        .await;

    if let Some(materialized) = build.take() {
        print_summary(&materialized)?;
    }

    if let Err(e) = report.into_result() {
        cliclack::outro_cancel("Project generation failed")?;
        return Err(e).context("Failed to generate project");
    }

    // Step 5: Show next steps
    print_next_steps(product, &config.dest)?;

    Ok(())
}

fn collect_configuration(args: &CreateArgs) -> Result<Configuration> {
    let human_name: String = cliclack::input("Give our project a (human) name:")
        .validate(|s: &String| validate::required(s))
        .interact()?;

    let mut config = Configuration::from_human_name(&human_name);
    if args.yes {
        return Ok(config);
    }

    config.site_name = cliclack::input("Give our site a name:")
        .default_input(&config.site_name)
        .validate(|s: &String| validate::required(s))
        .interact()?;

    config.machine_name = cliclack::input("Provide a machine name for the project:")
        .default_input(&config.machine_name)
        .validate(|s: &String| validate::machine_name(s))
        .interact()?;

    let default_dest = format!("./{}", config.machine_name);
    let dest: String = cliclack::input("Where should we create the files?")
        .default_input(&default_dest)
        .interact()?;
    config.dest = PathBuf::from(dest);

    let dev_ip: String = cliclack::input(
        "Provide the IP address for the development environment, if you do have one:",
    )
    .required(false)
    .validate(|s: &String| validate::optional_ip(s))
    .interact()?;
    config.dev_ip = Some(dev_ip).filter(|ip| !ip.is_empty());

    config.git_init = cliclack::confirm("Initialize a git repository?")
        .initial_value(false)
        .interact()?;

    if config.git_init {
        let remote: String = cliclack::input("Remote repository URL (optional):")
            .required(false)
            .validate(|s: &String| validate::optional_remote(s))
            .interact()?;
        config.git_remote = Some(remote).filter(|r| !r.is_empty());
    }

    if !args.no_install {
        config.install_dependencies = cliclack::confirm("Install dependencies after generating?")
            .initial_value(true)
            .interact()?;
    }

    Ok(config)
}

fn check_destination(dest: &Path, args: &CreateArgs) -> Result<()> {
    if !dest.is_dir() {
        return Ok(());
    }

    let count = std::fs::read_dir(dest)
        .with_context(|| format!("Failed to read {}", dest.display()))?
        .count();
    if count == 0 {
        return Ok(());
    }

    cliclack::log::warning(format!(
        "{} has {} existing items; conflicting files will be resolved one by one",
        dest.display(),
        count
    ))?;

    // Auto-confirm with --yes flag
    let confirm = if args.yes {
        true
    } else {
        cliclack::confirm("Continue anyway?")
            .initial_value(true)
            .interact()?
    };

    if !confirm {
        anyhow::bail!("Setup cancelled.");
    }
    Ok(())
}

fn setup_fetcher<C: ProductConfig>(product: &C, args: &CreateArgs) -> Result<SkeletonFetcher> {
    let source = match &args.skeleton_dir {
        Some(path) => {
            cliclack::log::info(format!("Using local skeleton from {}", path.display()))?;
            SkeletonSource::local(path.clone())
        }
        None => {
            let source = SkeletonSource::from_config(product)?;
            cliclack::log::info(format!("Using skeleton {}", source.describe()))?;
            source
        }
    };

    Ok(SkeletonFetcher::new(source).with_options(AcquireOptions {
        attempts: args.retries + 1,
        ..AcquireOptions::default()
    }))
}

fn conflict_policy(config: &Configuration, args: &CreateArgs) -> Box<dyn ConflictPolicy> {
    match (args.on_conflict, args.yes) {
        (Some(resolution), _) => Box::new(FixedPolicy(resolution)),
        (None, true) => Box::new(FixedPolicy(Resolution::Skip)),
        (None, false) => Box::new(InteractivePolicy::new(config.dest.clone())),
    }
}

fn task_label(task: &str) -> &str {
    match task {
        stages::CLONE => "Cloning skeleton",
        stages::BUILD => "Generating files",
        stages::INSTALL => "Installing dependencies",
        stages::GIT_INIT => "Initializing git repository",
        other => other,
    }
}

fn log_event(event: &TaskEvent) {
    // Output failures here are cosmetic; the run result carries the real error
    let _ = match event {
        TaskEvent::Started { task } => cliclack::log::step(format!("{}...", task_label(task))),
        TaskEvent::Completed { task } => cliclack::log::success(format!("{} done", task_label(task))),
        TaskEvent::Skipped { task } => cliclack::log::remark(format!("{} skipped", task_label(task))),
        TaskEvent::Failed { task, cause } => {
            cliclack::log::error(format!("{} failed: {}", task_label(task), cause))
        }
        TaskEvent::Finished { .. } => Ok(()),
    };
}

fn print_summary(report: &MaterializeReport) -> Result<()> {
    let mut lines = vec![format!("Wrote {} files", report.written())];
    if !report.skipped.is_empty() {
        lines.push(format!("Skipped {} existing files", report.skipped.len()));
    }
    if !report.unchanged.is_empty() {
        lines.push(format!("{} files already up to date", report.unchanged.len()));
    }
    for (original, written) in &report.suffixed {
        lines.push(format!("{} written as {}", original.display(), written.display()));
    }
    cliclack::log::info(lines.join("\n"))?;
    Ok(())
}

fn print_next_steps<C: ProductConfig>(product: &C, dest: &Path) -> Result<()> {
    let steps = product.next_steps(dest);

    println!();
    println!("  Next steps");
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro("Happy coding!")?;

    Ok(())
}
