//! Error types for kiln-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{OperationKind, TargetName, TaskName};

/// All errors that can arise while loading configuration or building the
/// task registry. Every variant is fatal and is raised before any task runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading a pipeline file or descriptor.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pipeline YAML failed to parse; includes file path and line context.
    #[error("failed to parse pipeline at {path}: {source}")]
    PipelineParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A descriptor file is not valid JSON.
    #[error("failed to parse descriptor at {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A descriptor parsed, but its root is not a key/value object.
    #[error("descriptor {source_name} is not an object")]
    NotAnObject { source_name: String },

    /// A step string could not be parsed.
    #[error("invalid step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    /// A task name was referenced (or invoked) but never registered.
    #[error("task '{name}' not found{}", referenced_suffix(.referenced_by))]
    UnknownTask {
        name: TaskName,
        referenced_by: Option<TaskName>,
    },

    /// A `kind:target` step names a target that has no configuration record.
    #[error("no {kind} target named '{target}'{}", referenced_suffix(.referenced_by))]
    UnknownTarget {
        kind: OperationKind,
        target: TargetName,
        referenced_by: Option<TaskName>,
    },

    /// The same task name was registered twice.
    #[error("task '{0}' is registered more than once")]
    DuplicateTask(TaskName),

    /// Task references form a cycle; `path` starts and ends with the same task.
    #[error("task cycle detected: {}", join_cycle(.path))]
    Cycle { path: Vec<TaskName> },
}

fn referenced_suffix(referenced_by: &Option<TaskName>) -> String {
    referenced_by
        .as_ref()
        .map(|r| format!(" (referenced by '{r}')"))
        .unwrap_or_default()
}

fn join_cycle(path: &[TaskName]) -> String {
    path.iter().map(|t| t.0.as_str()).collect::<Vec<_>>().join(" -> ")
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
