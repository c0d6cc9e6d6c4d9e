//! druboot CLI - Drupal project generation from the druboot skeleton

use anyhow::Result;
use clap::Parser;
use druboot_core::skeleton::Resolution;
use druboot_core::tui::CreateArgs;
use druboot_core::ProductConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// druboot product configuration
#[derive(Clone)]
pub struct DrubootConfig;

impl ProductConfig for DrubootConfig {
    fn name(&self) -> &'static str {
        "druboot"
    }

    fn display_name(&self) -> &'static str {
        "Druboot"
    }

    fn default_skeleton_url(&self) -> &'static str {
        "https://github.com/TallerWebSolutions/druboot.git"
    }

    fn skeleton_url_env(&self) -> &'static str {
        "DRUBOOT_SKELETON_URL"
    }

    fn cli_description(&self) -> &'static str {
        "Generate a Drupal project from the druboot skeleton"
    }

    fn next_steps(&self, dest: &Path) -> Vec<String> {
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        if current.as_deref() != Some(dest) {
            steps.push(format!("cd {}", dest.display()));
        }

        steps.push("vagrant up".to_string());
        steps.push("Open README.md to get started".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "druboot")]
#[command(about = "Generate a Drupal project from the druboot skeleton")]
#[command(version)]
pub struct Args {
    /// YAML file with the answers to the generator questions
    #[arg(long)]
    pub answers: Option<PathBuf>,

    /// Local directory to use as the skeleton instead of cloning (for development use)
    #[arg(long = "skeleton-dir")]
    pub skeleton_dir: Option<PathBuf>,

    /// Skeleton branch to generate from
    #[arg(long)]
    pub variant: Option<String>,

    /// Answer for every conflicting file: overwrite, skip, suffix or abort
    #[arg(long = "on-conflict")]
    pub on_conflict: Option<Resolution>,

    /// Do not install dependencies after generating
    #[arg(long = "no-install")]
    pub no_install: bool,

    /// Extra clone attempts when the first one fails
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Keep the cloned skeleton after generation
    #[arg(long = "keep-workspace")]
    pub keep_workspace: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,

    /// Log diagnostics to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl From<Args> for CreateArgs {
    fn from(args: Args) -> Self {
        CreateArgs {
            answers: args.answers,
            skeleton_dir: args.skeleton_dir,
            variant: args.variant,
            on_conflict: args.on_conflict,
            no_install: args.no_install,
            retries: args.retries,
            keep_workspace: args.keep_workspace,
            yes: args.yes,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "druboot=debug,druboot_core=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let result = druboot_core::run(&DrubootConfig, args.into()).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}
