//! Per-run state every primitive reads from.

use std::path::{Path, PathBuf};

use kiln_core::Metadata;
use kiln_renderer::resolve;

use crate::error::SyncError;

/// Project root plus the composed metadata. Read-only for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub root: &'a Path,
    pub metadata: &'a Metadata,
}

impl<'a> StepContext<'a> {
    pub fn new(root: &'a Path, metadata: &'a Metadata) -> Self {
        Self { root, metadata }
    }

    /// Resolve a template string.
    pub fn resolve(&self, template: &str) -> Result<String, SyncError> {
        Ok(resolve(template, self.metadata)?)
    }

    /// Resolve a template and anchor it at the project root.
    pub fn path(&self, template: &str) -> Result<PathBuf, SyncError> {
        Ok(self.root.join(self.resolve(template)?))
    }
}
