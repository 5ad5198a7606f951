//! `copy` — copy matched files, applying the file set's content transform.

use kiln_core::{ContentTransform, CopyTarget};

use crate::context::StepContext;
use crate::error::{io_err, SyncError};
use crate::fileset::expand;
use crate::writer::{atomic_write, FileChange};

pub fn run(target: &CopyTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let mut changes = Vec::new();
    for set in &target.files {
        for mapping in expand(set, ctx)?.require_sources()? {
            let bytes = std::fs::read(&mapping.src).map_err(|e| io_err(&mapping.src, e))?;
            let out = match (set.transform, std::str::from_utf8(&bytes)) {
                (ContentTransform::None, _) => bytes,
                (transform, Ok(text)) => {
                    kiln_renderer::apply(transform, text, ctx.metadata)?.into_bytes()
                }
                (_, Err(_)) => {
                    tracing::debug!("binary file copied untransformed: {}", mapping.src.display());
                    bytes
                }
            };
            changes.push(atomic_write(&mapping.dest, &out)?);
        }
    }
    Ok(changes)
}
