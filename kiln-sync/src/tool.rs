//! External programs: `exec` runs one command, `minify` runs one per file.

use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_core::{MinifyTarget, ToolCommand};

use crate::context::StepContext;
use crate::error::SyncError;
use crate::fileset::expand;
use crate::writer::{ensure_parent, FileChange};

/// Run `command` once from the project root (or its own `cwd`).
pub fn exec(command: &ToolCommand, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let args = command
        .args
        .iter()
        .map(|a| ctx.resolve(a))
        .collect::<Result<Vec<_>, _>>()?;
    spawn(command, args, ctx)?;
    Ok(Vec::new())
}

/// Run the minifier once per matched file, with `{src}` and `{dest}` in its
/// arguments replaced by the file pair.
pub fn minify(target: &MinifyTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let mut changes = Vec::new();
    for set in &target.files {
        for mapping in expand(set, ctx)?.require_sources()? {
            ensure_parent(&mapping.dest)?;
            let args = target
                .command
                .args
                .iter()
                .map(|a| Ok(substitute(&ctx.resolve(a)?, &mapping.src, &mapping.dest)))
                .collect::<Result<Vec<_>, SyncError>>()?;
            spawn(&target.command, args, ctx)?;
            tracing::debug!("minified: {} -> {}", mapping.src.display(), mapping.dest.display());
            changes.push(FileChange::Written { path: mapping.dest });
        }
    }
    Ok(changes)
}

fn substitute(arg: &str, src: &Path, dest: &Path) -> String {
    arg.replace("{src}", &src.to_string_lossy())
        .replace("{dest}", &dest.to_string_lossy())
}

fn spawn(command: &ToolCommand, args: Vec<String>, ctx: &StepContext<'_>) -> Result<(), SyncError> {
    let program = ctx.resolve(&command.program)?;
    let cwd: PathBuf = match &command.cwd {
        Some(cwd) => ctx.path(cwd)?,
        None => ctx.root.to_path_buf(),
    };

    tracing::debug!("exec: {} {}", program, args.join(" "));
    let status = Command::new(&program)
        .args(&args)
        .current_dir(&cwd)
        .status()
        .map_err(|e| SyncError::ToolSpawn {
            program: program.clone(),
            source: e,
        })?;

    if !status.success() {
        return Err(SyncError::ToolFailed {
            program,
            code: status.code(),
        });
    }
    Ok(())
}
