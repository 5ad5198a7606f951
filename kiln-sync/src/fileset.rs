//! File set expansion — glob patterns to ordered (source, destination) pairs.
//!
//! Expansion happens when the owning step runs, so files produced by earlier
//! steps are visible. Order: patterns in declared order, matches of one
//! pattern in lexical order, first occurrence wins on duplicates.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};

use kiln_core::FileSet;

use crate::context::StepContext;
use crate::error::SyncError;

/// Wildcards never match a leading `.`, so dotfiles need an explicit pattern.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// One concrete source → destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub src: PathBuf,
    pub dest: PathBuf,
}

/// Result of expanding a [`FileSet`].
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub mappings: Vec<FileMapping>,
    /// Literal (glob-free) patterns that matched nothing on disk.
    pub missing: Vec<PathBuf>,
}

impl Expansion {
    /// Fail with [`SyncError::MissingSource`] if a literal source is absent.
    pub fn require_sources(self) -> Result<Vec<FileMapping>, SyncError> {
        match self.missing.into_iter().next() {
            Some(path) => Err(SyncError::MissingSource { path }),
            None => Ok(self.mappings),
        }
    }
}

/// Expand `set` against the filesystem.
pub fn expand(set: &FileSet, ctx: &StepContext<'_>) -> Result<Expansion, SyncError> {
    let base = match &set.cwd {
        Some(cwd) => ctx.path(cwd)?,
        None => ctx.root.to_path_buf(),
    };
    let dest = set.dest.as_deref().map(|d| ctx.resolve(d)).transpose()?;

    let mut matched: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut missing = Vec::new();

    for raw in &set.src {
        let pattern = ctx.resolve(raw)?;
        if let Some(excluded) = pattern.strip_prefix('!') {
            let excludes = expand_braces(excluded)
                .iter()
                .map(|alt| compile(alt))
                .collect::<Result<Vec<_>, _>>()?;
            matched.retain(|rel| {
                let keep = !excludes.iter().any(|p| p.matches_path_with(rel, MATCH_OPTIONS));
                if !keep {
                    seen.remove(rel);
                }
                keep
            });
            continue;
        }

        for alt in expand_braces(&pattern) {
            let found = glob_files(&base, &alt)?;
            if found.is_empty() && !is_glob(&alt) && !base.join(&alt).exists() {
                missing.push(base.join(&alt));
            }
            for rel in found {
                if seen.insert(rel.clone()) {
                    matched.push(rel);
                }
            }
        }
    }

    let mappings = matched
        .into_iter()
        .map(|rel| {
            let src = base.join(&rel);
            let dest = destination(set, ctx.root, dest.as_deref(), &rel, &src);
            FileMapping { src, dest }
        })
        .collect();

    Ok(Expansion { mappings, missing })
}

fn destination(
    set: &FileSet,
    root: &Path,
    dest: Option<&str>,
    rel: &Path,
    src: &Path,
) -> PathBuf {
    let target = match dest {
        _ if set.expand => root.join(dest.unwrap_or_default()).join(rel),
        Some(d) if d.ends_with('/') => root.join(d).join(rel),
        Some(d) => root.join(d),
        None => src.to_path_buf(),
    };
    match &set.ext {
        Some(ext) => replace_ext(&target, ext),
        None => target,
    }
}

/// Replace everything from the first dot of the file name with `ext`.
pub(crate) fn replace_ext(path: &Path, ext: &str) -> PathBuf {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_path_buf();
    };
    let stem = match name.find('.') {
        Some(0) | None => name.as_str(),
        Some(i) => &name[..i],
    };
    path.with_file_name(format!("{stem}{ext}"))
}

/// Files under `base` matching `pattern`, as paths relative to `base`.
fn glob_files(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, SyncError> {
    // a trailing `**` only yields directories; `**/*` yields the files below
    let full = if pattern.ends_with("**") {
        full_pattern(base, &format!("{pattern}/*"))
    } else {
        full_pattern(base, pattern)
    };
    let paths = glob_with(&full, MATCH_OPTIONS).map_err(|e| SyncError::Pattern {
        pattern: pattern.to_owned(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                if let Ok(rel) = path.strip_prefix(base) {
                    files.push(rel.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("skipping unreadable path: {e}"),
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// All paths (files and directories) matching `pattern` relative to `base`.
pub(crate) fn glob_any(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, SyncError> {
    let mut out = Vec::new();
    for alt in expand_braces(pattern) {
        let full = full_pattern(base, &alt);
        let paths = glob_with(&full, MATCH_OPTIONS).map_err(|e| SyncError::Pattern {
            pattern: alt.clone(),
            source: e,
        })?;
        out.extend(paths.filter_map(Result::ok));
    }
    Ok(out)
}

fn full_pattern(base: &Path, pattern: &str) -> String {
    let base = base.to_string_lossy();
    format!("{}/{}", Pattern::escape(base.trim_end_matches('/')), pattern)
}

fn compile(pattern: &str) -> Result<Pattern, SyncError> {
    Pattern::new(pattern).map_err(|e| SyncError::Pattern {
        pattern: pattern.to_owned(),
        source: e,
    })
}

pub(crate) fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand `{a,b}` alternatives; nested braces expand recursively.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_owned()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, ch) in pattern[open..].char_indices() {
        let i = open + i;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_owned()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{prefix}{}{suffix}", &pattern[w[0] + 1..w[1]])))
        .collect()
}
