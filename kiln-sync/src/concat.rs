//! `concat` — join matched files into their destinations.

use std::path::PathBuf;

use kiln_core::ConcatTarget;

use crate::context::StepContext;
use crate::error::{io_err, SyncError};
use crate::fileset::expand;
use crate::writer::{atomic_write, FileChange};

pub const DEFAULT_SEPARATOR: &str = "\n";

/// Concatenate every file set of `target`.
///
/// Sources sharing a destination are joined in match order. With `process`
/// each source is template-resolved before joining. All sources are read
/// before anything is written, so in-place processing is safe.
pub fn run(target: &ConcatTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let separator = target.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
    let mut outputs: Vec<(PathBuf, Vec<String>)> = Vec::new();

    for set in &target.files {
        let expansion = expand(set, ctx)?;
        let mappings = if set.expand {
            expansion.mappings
        } else {
            expansion.require_sources()?
        };

        for mapping in mappings {
            let raw = std::fs::read_to_string(&mapping.src).map_err(|e| io_err(&mapping.src, e))?;
            let content = if target.process { ctx.resolve(&raw)? } else { raw };
            match outputs.iter_mut().find(|(dest, _)| *dest == mapping.dest) {
                Some((_, parts)) => parts.push(content),
                None => outputs.push((mapping.dest, vec![content])),
            }
        }
    }

    outputs
        .into_iter()
        .map(|(dest, parts)| atomic_write(&dest, parts.join(separator).as_bytes()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{FileSet, Metadata};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn files(src: &[&str], dest: &str) -> FileSet {
        FileSet {
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: Some(dest.into()),
            ..FileSet::default()
        }
    }

    #[test]
    fn joins_sources_in_pattern_order() {
        let root = TempDir::new().unwrap();
        write(root.path(), "lib/jquery-ui/ui/jquery.ui.core.js", "core");
        write(root.path(), "lib/jquery-ui/ui/jquery.ui.widget.js", "widget");
        write(root.path(), "lib/jquery-ui/ui/jquery.ui.mouse.js", "mouse");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        let target = ConcatTarget {
            files: vec![files(
                &[
                    "lib/jquery-ui/ui/jquery.ui.core.js",
                    "lib/jquery-ui/ui/jquery.ui.widget.js",
                    "lib/jquery-ui/ui/jquery.ui.mouse.js",
                ],
                "build/out/jquery-ui.js",
            )],
            process: false,
            separator: None,
        };
        let changes = run(&target, &ctx).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            fs::read_to_string(root.path().join("build/out/jquery-ui.js")).unwrap(),
            "core\nwidget\nmouse"
        );
    }

    #[test]
    fn custom_separator() {
        let root = TempDir::new().unwrap();
        write(root.path(), "a.js", "a");
        write(root.path(), "b.js", "b");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        let target = ConcatTarget {
            files: vec![files(&["a.js", "b.js"], "ab.js")],
            process: false,
            separator: Some(";\n".into()),
        };
        run(&target, &ctx).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("ab.js")).unwrap(), "a;\nb");
    }

    #[test]
    fn process_resolves_in_place() {
        let root = TempDir::new().unwrap();
        write(root.path(), "dist/fullcalendar.js", "/* v<%= meta.version %> */");
        write(root.path(), "dist/fullcalendar.css", "/* <%= meta.name %> */");
        let meta = Metadata::try_from(json!({"meta": {"name": "fullcalendar", "version": "2.0.0"}}))
            .unwrap();
        let ctx = StepContext::new(root.path(), &meta);

        let target = ConcatTarget {
            files: vec![FileSet {
                cwd: Some("dist/".into()),
                src: vec!["*.js".into(), "*.css".into()],
                dest: Some("dist/".into()),
                expand: true,
                ..FileSet::default()
            }],
            process: true,
            separator: None,
        };
        let changes = run(&target, &ctx).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            fs::read_to_string(root.path().join("dist/fullcalendar.js")).unwrap(),
            "/* v2.0.0 */"
        );
        assert_eq!(
            fs::read_to_string(root.path().join("dist/fullcalendar.css")).unwrap(),
            "/* fullcalendar */"
        );
    }

    #[test]
    fn missing_literal_source_fails_without_writing() {
        let root = TempDir::new().unwrap();
        write(root.path(), "a.js", "a");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        let target = ConcatTarget {
            files: vec![files(&["a.js", "missing.js"], "out.js")],
            process: false,
            separator: None,
        };
        let err = run(&target, &ctx).unwrap_err();
        assert!(matches!(err, SyncError::MissingSource { .. }));
        assert!(!root.path().join("out.js").exists());
    }

    #[test]
    fn unresolved_placeholder_aborts() {
        let root = TempDir::new().unwrap();
        write(root.path(), "a.js", "<%= meta.nope %>");
        let meta = Metadata::new();
        let ctx = StepContext::new(root.path(), &meta);

        let target = ConcatTarget {
            files: vec![files(&["a.js"], "out.js")],
            process: true,
            separator: None,
        };
        assert!(matches!(run(&target, &ctx), Err(SyncError::Render(_))));
    }
}
