//! # kiln-sync
//!
//! File primitives and the task executor.
//!
//! Build a [`Pipeline`] from a project root and a loaded
//! [`kiln_core::PipelineConfig`], then call [`Pipeline::run`] with a task
//! name. Each primitive module (`clean`, `concat`, `copy`, `compress`,
//! `tool`, `manifest`) can also be driven directly with a [`StepContext`].

pub mod clean;
pub mod compress;
pub mod concat;
pub mod context;
pub mod copy;
pub mod error;
pub mod fileset;
pub mod manifest;
pub mod pipeline;
pub mod tool;
pub mod writer;

pub use compress::ArchiveFormat;
pub use context::StepContext;
pub use error::SyncError;
pub use fileset::{expand, Expansion, FileMapping};
pub use manifest::publish;
pub use pipeline::{Pipeline, RunReport, StepOutcome, TaskState};
pub use writer::{atomic_write, FileChange};
