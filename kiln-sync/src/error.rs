//! Error types for kiln-sync.

use std::path::PathBuf;

use thiserror::Error;

use kiln_core::error::ConfigError;
use kiln_renderer::RenderError;

/// All errors that can arise while executing steps.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration or descriptor error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A template could not be resolved.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// A required source file or directory does not exist.
    #[error("missing source: {path}")]
    MissingSource { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file set pattern is not a valid glob.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Clean was asked to delete the project root or something outside it.
    #[error("refusing to clean {path}: outside the project root {root}")]
    UnsafeClean { path: PathBuf, root: PathBuf },

    /// An external program could not be started.
    #[error("failed to start '{program}': {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("'{program}' exited with {}", describe_exit(.code))]
    ToolFailed { program: String, code: Option<i32> },

    /// Archive extension is not one we can produce.
    #[error("unsupported archive format: {path} (expected .tar.gz, .tgz or .tar)")]
    UnsupportedArchive { path: PathBuf },

    /// JSON serialization error (manifest).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A step failed; wraps the underlying error with the step name.
    #[error("step \"{step}\" failed")]
    StepFailed {
        step: String,
        #[source]
        source: Box<SyncError>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_owned(),
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
