//! Error types for the scaffolding pipeline
//!
//! Every failure carries enough context (task, path, underlying cause) to be
//! reported to a human without further lookup.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while resolving placeholder values from a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    /// A required placeholder has no usable value
    #[error("no value for required placeholder {key} ({token})")]
    MissingValue { key: String, token: String },

    /// A configuration value embeds a placeholder token
    #[error("value for {key} contains the placeholder token {token}")]
    ValueContainsToken { key: String, token: String },
}

/// Main error type for druboot operations
#[derive(Error, Debug)]
pub enum ScaffoldError {
    /// Cloning or copying the skeleton failed
    #[error("failed to acquire skeleton from {source_ref}: {reason}")]
    Acquisition { source_ref: String, reason: String },

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// The conflict policy asked to halt the run
    #[error("aborted at conflicting file {}", path.display())]
    ConflictAbort { path: PathBuf },

    /// Writing into the destination tree failed
    #[error("failed to write {}: {source}", path.display())]
    Materialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dependency-install command failed
    #[error("dependency installation failed: {0}")]
    Install(String),

    /// Repository initialization at the destination failed
    #[error("version control setup failed: {0}")]
    VersionControl(String),

    /// The task graph could not be built
    #[error("invalid pipeline: {0}")]
    Pipeline(String),

    /// The placeholder map violates its invariants
    #[error("invalid placeholder map: {0}")]
    Placeholder(String),

    /// The configuration record is incomplete or malformed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A task failed; wraps the first failure of the run
    #[error("task `{task}` failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<ScaffoldError>,
    },
}

impl ScaffoldError {
    /// The innermost error, looking through `TaskFailed` wrappers
    pub fn root_cause(&self) -> &ScaffoldError {
        match self {
            ScaffoldError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the task that failed, if this error came out of a pipeline run
    pub fn task(&self) -> Option<&str> {
        match self {
            ScaffoldError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

/// Result type alias for druboot operations
pub type Result<T> = std::result::Result<T, ScaffoldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_reports_task_and_cause() {
        let err = ScaffoldError::TaskFailed {
            task: "clone".to_string(),
            source: Box::new(ScaffoldError::Acquisition {
                source_ref: "https://example.com/skeleton.git".to_string(),
                reason: "could not resolve host".to_string(),
            }),
        };

        assert_eq!(err.task(), Some("clone"));
        let msg = err.to_string();
        assert!(msg.contains("clone"));
        assert!(msg.contains("could not resolve host"));
        assert!(matches!(err.root_cause(), ScaffoldError::Acquisition { .. }));
    }

    #[test]
    fn test_materialization_error_names_path() {
        let err = ScaffoldError::Materialization {
            path: PathBuf::from("site/settings.php"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("site/settings.php"));
        assert_eq!(err.task(), None);
    }
}
