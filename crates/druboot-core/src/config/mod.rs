//! Project configuration record
//!
//! A `Configuration` is produced once (by the prompts or from an answers file)
//! and then only read. Every pipeline stage receives it by reference.

pub mod validate;

use crate::error::{Result, ScaffoldError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Answers describing the project to generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Human-readable project name
    pub human_name: String,

    /// Site name shown by Drupal
    pub site_name: String,

    /// Machine name, `^[a-z][a-z0-9]+$`
    pub machine_name: String,

    /// Where the project is written (relative paths resolve against the cwd)
    pub dest: PathBuf,

    /// IP address of the development environment
    #[serde(default)]
    pub dev_ip: Option<String>,

    /// Initialize a git repository in the generated project
    #[serde(default)]
    pub git_init: bool,

    /// Remote registered as `origin` when `git_init` is set
    #[serde(default)]
    pub git_remote: Option<String>,

    /// Skeleton branch to clone; `None` uses the remote's default branch
    #[serde(default)]
    pub variant: Option<String>,

    /// Run the package managers found in the generated project
    #[serde(default = "default_true")]
    pub install_dependencies: bool,
}

impl Configuration {
    /// Build a configuration with the defaults the prompts would offer:
    /// site name from the human name, machine name slugged from the human
    /// name, destination `./<machine name>`
    pub fn from_human_name(human_name: &str) -> Self {
        let machine_name = validate::machine_name_from(human_name);
        Self {
            human_name: human_name.to_string(),
            site_name: human_name.to_string(),
            dest: PathBuf::from(format!("./{}", machine_name)),
            machine_name,
            dev_ip: None,
            git_init: false,
            git_remote: None,
            variant: None,
            install_dependencies: true,
        }
    }

    /// Load answers from a YAML file and validate them
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScaffoldError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse answers from YAML and validate them
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)
            .map_err(|e| ScaffoldError::Config(format!("failed to parse answers: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against the rules the prompts enforce
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("human_name", validate::required(&self.human_name)),
            ("site_name", validate::required(&self.site_name)),
            ("machine_name", validate::machine_name(&self.machine_name)),
            ("dev_ip", validate::optional_ip(self.dev_ip.as_deref().unwrap_or(""))),
            (
                "git_remote",
                validate::optional_remote(self.git_remote.as_deref().unwrap_or("")),
            ),
        ];

        for (field, check) in checks {
            if let Err(msg) = check {
                return Err(ScaffoldError::Config(format!("{}: {}", field, msg)));
            }
        }

        if self.dest.as_os_str().is_empty() {
            return Err(ScaffoldError::Config("dest: This option is required".to_string()));
        }

        if self.git_remote.is_some() && !self.git_init {
            return Err(ScaffoldError::Config(
                "git_remote is only valid when git_init is set".to_string(),
            ));
        }

        Ok(())
    }

    /// Remote to register, only when repository initialization is requested
    pub fn remote(&self) -> Option<&str> {
        if self.git_init {
            self.git_remote.as_deref().filter(|r| !r.is_empty())
        } else {
            None
        }
    }
}
