//! kiln core library — pipeline types, metadata composition, task registry.
//!
//! - [`types`] — newtypes, steps, file sets and per-kind target records
//! - [`error`] — [`ConfigError`]
//! - [`metadata`] — descriptor composition into a [`Metadata`] context
//! - [`config`] — pipeline file loading (project file or built-in)
//! - [`registry`] — validated [`TaskRegistry`] built via [`RegistryBuilder`]

pub mod config;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod types;

pub use error::ConfigError;
pub use metadata::{compose, Metadata};
pub use registry::{RegistryBuilder, TaskRegistry};
pub use types::{
    CleanTarget, CompressTarget, ConcatTarget, ContentTransform, CopyTarget, FileSet,
    ManifestTarget, MinifyTarget, OperationKind, OperationRef, PipelineConfig, Step, TargetName,
    Targets, Task, TaskDef, TaskName, ToolCommand,
};
