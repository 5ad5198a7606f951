//! `clean` — delete generated files and directories.

use std::path::{Component, Path, PathBuf};

use kiln_core::CleanTarget;

use crate::context::StepContext;
use crate::error::{io_err, SyncError};
use crate::fileset::{expand_braces, glob_any, is_glob};
use crate::writer::FileChange;

/// Delete every path or glob listed in `target`.
///
/// Missing paths are skipped. The project root itself and anything that
/// resolves outside it are refused before anything is deleted.
pub fn run(target: &CleanTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let root = absolute(ctx.root)?;
    let mut victims = Vec::new();

    for raw in &target.paths {
        let pattern = ctx.resolve(raw)?;
        if is_glob(&pattern) {
            victims.extend(glob_any(ctx.root, &pattern)?);
        } else {
            victims.extend(expand_braces(&pattern).into_iter().map(|p| ctx.root.join(p)));
        }
    }

    for path in &victims {
        let normalized = absolute(path)?;
        if normalized == root || !normalized.starts_with(&root) {
            return Err(SyncError::UnsafeClean {
                path: path.clone(),
                root: ctx.root.to_path_buf(),
            });
        }
    }

    let mut changes = Vec::new();
    for path in victims {
        if remove(&path)? {
            tracing::debug!("removed: {}", path.display());
            changes.push(FileChange::Removed { path });
        }
    }
    Ok(changes)
}

/// Remove a file or a whole directory tree. `Ok(false)` if nothing was there.
fn remove(path: &Path) -> Result<bool, SyncError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_err(path, e)),
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Anchor `path` at the cwd when relative, then normalize it.
fn absolute(path: &Path) -> Result<PathBuf, SyncError> {
    std::path::absolute(path)
        .map(|abs| normalize(&abs))
        .map_err(|e| io_err(path, e))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Metadata;
    use std::fs;
    use tempfile::TempDir;

    fn target(paths: &[&str]) -> CleanTarget {
        CleanTarget {
            paths: paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn removes_globbed_files_and_directories() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "dist/fullcalendar.js");
        touch(root.path(), "dist/fullcalendar.css");
        touch(root.path(), "dist/fullcalendar.min.js.map");
        touch(root.path(), "dist/src/intro.js");
        touch(root.path(), "dist/keep.txt");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        let changes = run(&target(&["dist/*.{js,css,map}", "dist/src"]), &ctx).unwrap();
        assert_eq!(changes.len(), 4);
        assert!(!root.path().join("dist/src").exists());
        assert!(!root.path().join("dist/fullcalendar.js").exists());
        assert!(root.path().join("dist/keep.txt").exists());
    }

    #[test]
    fn missing_paths_are_a_no_op() {
        let root = TempDir::new().unwrap();
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);
        let changes = run(&target(&["build/temp", "dist/*.tar.gz"]), &ctx).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn refuses_root_and_parent_paths() {
        let root = TempDir::new().unwrap();
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        for bad in [".", "", "../outside", "dist/../.."] {
            let err = run(&target(&[bad]), &ctx).unwrap_err();
            assert!(matches!(err, SyncError::UnsafeClean { .. }), "{bad}: {err}");
        }
        assert!(root.path().exists());
    }

    #[test]
    fn relative_root_still_guards_its_parent() {
        // Unit tests run from the crate directory, so `..` is a real parent.
        let outside = tempfile::tempdir_in("..").unwrap();
        fs::write(outside.path().join("victim.txt"), "keep").unwrap();
        let name = outside.path().file_name().unwrap().to_str().unwrap();
        let meta = Metadata::new();
        let ctx = StepContext::new(Path::new("."), &meta);

        let escape = format!("../{name}/victim.txt");
        let err = run(&target(&[&escape]), &ctx).unwrap_err();
        assert!(matches!(err, SyncError::UnsafeClean { .. }), "{err}");
        assert!(outside.path().join("victim.txt").exists());

        let err = run(&target(&["."]), &ctx).unwrap_err();
        assert!(matches!(err, SyncError::UnsafeClean { .. }), "{err}");
    }

    #[test]
    fn unsafe_entry_aborts_before_any_deletion() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "build/temp/a.js");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        assert!(run(&target(&["build/temp", ".."]), &ctx).is_err());
        assert!(root.path().join("build/temp/a.js").exists());
    }

    #[test]
    fn paths_are_template_resolved() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "dist/cdnjs/2.0/fullcalendar.js");
        let meta = Metadata::try_from(serde_json::json!({"meta": {"version": "2.0"}})).unwrap();
        let ctx = StepContext::new(root.path(), &meta);

        run(&target(&["dist/cdnjs/<%= meta.version %>"]), &ctx).unwrap();
        assert!(!root.path().join("dist/cdnjs/2.0").exists());
        assert!(root.path().join("dist/cdnjs").exists());
    }
}
