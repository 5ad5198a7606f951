//! `manifest` — derive a publishing descriptor from a base plus overrides.

use std::path::Path;

use serde_json::Value;

use kiln_core::metadata::load_descriptor;
use kiln_core::{compose, ManifestTarget};

use crate::context::StepContext;
use crate::error::SyncError;
use crate::writer::{atomic_write, FileChange};

/// Shallow-merge `overrides` onto `base` and write the result to `dest` as
/// 2-space indented JSON. Base keys keep their order; new keys follow.
pub fn publish(base: &Value, overrides: &Value, dest: &Path) -> Result<FileChange, SyncError> {
    let merged = compose([base.clone(), overrides.clone()])?;
    let json = serde_json::to_string_pretty(&merged.into_value())?;
    atomic_write(dest, json.as_bytes())
}

pub fn run(target: &ManifestTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let base = load_descriptor(&ctx.path(&target.base)?)?;
    let overrides = load_descriptor(&ctx.path(&target.overrides)?)?;
    Ok(vec![publish(&base, &overrides, &ctx.path(&target.dest)?)?])
}
