//! Domain types for the kiln pipeline configuration.
//!
//! Every string that names a path or file here is a *template*: it may carry
//! `<%= ns.key %>` placeholders and is resolved only when the step that owns it
//! runs. All types deserialize from the YAML pipeline file via serde.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a task in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskName(pub String);

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name for one configured target of an operation kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetName(pub String);

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TargetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The file transform primitive a step invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Clean,
    Concat,
    Copy,
    Compress,
    Minify,
    Exec,
    Manifest,
}

impl OperationKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [OperationKind] {
        &[
            OperationKind::Clean,
            OperationKind::Concat,
            OperationKind::Copy,
            OperationKind::Compress,
            OperationKind::Minify,
            OperationKind::Exec,
            OperationKind::Manifest,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Clean => "clean",
            OperationKind::Concat => "concat",
            OperationKind::Copy => "copy",
            OperationKind::Compress => "compress",
            OperationKind::Minify => "minify",
            OperationKind::Exec => "exec",
            OperationKind::Manifest => "manifest",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidStep {
                step: s.to_owned(),
                reason: format!("unknown operation kind '{s}'"),
            })
    }
}

/// Per-file content transform applied by `copy` before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContentTransform {
    /// Bytes are copied untouched.
    #[default]
    None,
    /// `<%= %>` placeholders in the file are resolved against the metadata.
    Template,
    /// `src=`/`href=` attribute values are rewritten for the archive layout.
    DemoPaths,
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One `(kind, target)` pair: the unit the executor actually runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationRef {
    pub kind: OperationKind,
    pub target: TargetName,
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target)
    }
}

/// A single entry in a task's step list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Run one configured target of a primitive (`kind:target`).
    RunOperation(OperationRef),
    /// Expand another task inline (`name`).
    RunTask(TaskName),
}

impl Step {
    /// Parse the textual form used in pipeline files.
    ///
    /// `"copy:demos"` is an operation, `"modules"` is a task reference.
    pub fn parse(raw: &str) -> Result<Step, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidStep {
                step: raw.to_owned(),
                reason: "empty step".to_owned(),
            });
        }
        match raw.split_once(':') {
            Some((kind, target)) => {
                if target.is_empty() {
                    return Err(ConfigError::InvalidStep {
                        step: raw.to_owned(),
                        reason: "missing target name after ':'".to_owned(),
                    });
                }
                let kind = kind.parse::<OperationKind>().map_err(|_| ConfigError::InvalidStep {
                    step: raw.to_owned(),
                    reason: format!("unknown operation kind '{kind}'"),
                })?;
                Ok(Step::RunOperation(OperationRef {
                    kind,
                    target: TargetName::from(target),
                }))
            }
            None => Ok(Step::RunTask(TaskName::from(raw))),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::RunOperation(op) => op.fmt(f),
            Step::RunTask(name) => name.fmt(f),
        }
    }
}

/// A validated task as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// File sets
// ---------------------------------------------------------------------------

/// A glob-driven source → destination mapping.
///
/// * `cwd` — directory the patterns are relative to (project root if absent).
/// * `src` — ordered patterns; a leading `!` excludes earlier matches.
/// * `dest` — a file, or a directory when it ends in `/` or `expand` is set.
/// * `ext` — replaces each destination file's extension (from the first dot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileSet {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub src: Vec<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub transform: ContentTransform,
}

// ---------------------------------------------------------------------------
// Per-kind target records
// ---------------------------------------------------------------------------

/// `clean:<target>` — paths or globs to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanTarget {
    #[serde(deserialize_with = "one_or_many")]
    pub paths: Vec<String>,
}

/// `concat:<target>` — join files, optionally resolving placeholders in them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatTarget {
    pub files: Vec<FileSet>,
    #[serde(default)]
    pub process: bool,
    #[serde(default)]
    pub separator: Option<String>,
}

/// `copy:<target>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyTarget {
    pub files: Vec<FileSet>,
}

/// `compress:<target>` — pack `cwd` into `archive` under the top-level dir `dest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressTarget {
    pub archive: String,
    pub cwd: String,
    pub dest: String,
}

/// An external program invocation. Arguments are templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// `minify:<target>` — run `command` once per file; `{src}`/`{dest}` in the
/// arguments are replaced with each file pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifyTarget {
    #[serde(flatten)]
    pub command: ToolCommand,
    pub files: Vec<FileSet>,
}

/// `manifest:<target>` — merge `overrides` onto `base` and write to `dest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTarget {
    pub base: String,
    pub overrides: String,
    pub dest: String,
}

/// All configured targets, keyed per operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Targets {
    #[serde(default)]
    pub clean: BTreeMap<TargetName, CleanTarget>,
    #[serde(default)]
    pub concat: BTreeMap<TargetName, ConcatTarget>,
    #[serde(default)]
    pub copy: BTreeMap<TargetName, CopyTarget>,
    #[serde(default)]
    pub compress: BTreeMap<TargetName, CompressTarget>,
    #[serde(default)]
    pub minify: BTreeMap<TargetName, MinifyTarget>,
    #[serde(default)]
    pub exec: BTreeMap<TargetName, ToolCommand>,
    #[serde(default)]
    pub manifest: BTreeMap<TargetName, ManifestTarget>,
}

impl Targets {
    /// Whether a target named `target` is configured for `kind`.
    pub fn contains(&self, kind: OperationKind, target: &TargetName) -> bool {
        match kind {
            OperationKind::Clean => self.clean.contains_key(target),
            OperationKind::Concat => self.concat.contains_key(target),
            OperationKind::Copy => self.copy.contains_key(target),
            OperationKind::Compress => self.compress.contains_key(target),
            OperationKind::Minify => self.minify.contains_key(target),
            OperationKind::Exec => self.exec.contains_key(target),
            OperationKind::Manifest => self.manifest.contains_key(target),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline file
// ---------------------------------------------------------------------------

/// A task as written in the pipeline file.
///
/// Accepts an alias (`default: archive`), a bare step list, or the detailed
/// form with a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDef {
    Alias(String),
    Steps(Vec<String>),
    Detailed {
        #[serde(default)]
        description: Option<String>,
        steps: Vec<String>,
    },
}

impl TaskDef {
    pub fn description(&self) -> Option<&str> {
        match self {
            TaskDef::Detailed { description, .. } => description.as_deref(),
            _ => None,
        }
    }

    pub fn raw_steps(&self) -> Vec<&str> {
        match self {
            TaskDef::Alias(name) => vec![name.as_str()],
            TaskDef::Steps(steps) | TaskDef::Detailed { steps, .. } => {
                steps.iter().map(String::as_str).collect()
            }
        }
    }
}

/// Root of the YAML pipeline file. Frozen once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Namespace → ordered descriptor files composed into that namespace.
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub tasks: BTreeMap<TaskName, TaskDef>,
    #[serde(default)]
    pub targets: Targets,
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(TaskName::from("archive").to_string(), "archive");
        assert_eq!(TargetName::from("demos").to_string(), "demos");
    }

    #[test]
    fn step_parse_operation_and_task() {
        let op = Step::parse("copy:archive-demos").unwrap();
        assert_eq!(
            op,
            Step::RunOperation(OperationRef {
                kind: OperationKind::Copy,
                target: TargetName::from("archive-demos"),
            })
        );
        assert_eq!(Step::parse("modules").unwrap(), Step::RunTask(TaskName::from("modules")));
    }

    #[test]
    fn step_parse_rejects_unknown_kind_and_empty_target() {
        assert!(matches!(Step::parse("uglify:modules"), Err(ConfigError::InvalidStep { .. })));
        assert!(matches!(Step::parse("copy:"), Err(ConfigError::InvalidStep { .. })));
        assert!(matches!(Step::parse("  "), Err(ConfigError::InvalidStep { .. })));
    }

    #[test]
    fn step_display_roundtrips_text_form() {
        for raw in ["clean:modules", "languages"] {
            assert_eq!(Step::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn file_set_accepts_single_pattern() {
        let fs: FileSet = serde_yaml::from_str("src: dist/lang-all.js\ndest: out/lang-all.js\n").unwrap();
        assert_eq!(fs.src, vec!["dist/lang-all.js".to_string()]);
        assert!(!fs.expand);
        assert_eq!(fs.transform, ContentTransform::None);
    }

    #[test]
    fn task_def_forms() {
        let cfg: PipelineConfig = serde_yaml::from_str(
            r#"
tasks:
  default: archive
  dev: [exec:lumbar, languages]
  modules:
    description: Build the modules
    steps: [clean:modules]
"#,
        )
        .unwrap();
        assert_eq!(cfg.tasks[&TaskName::from("default")].raw_steps(), vec!["archive"]);
        assert_eq!(cfg.tasks[&TaskName::from("dev")].raw_steps().len(), 2);
        assert_eq!(
            cfg.tasks[&TaskName::from("modules")].description(),
            Some("Build the modules")
        );
    }

    #[test]
    fn targets_contains_checks_the_right_kind() {
        let mut targets = Targets::default();
        targets
            .clean
            .insert(TargetName::from("temp"), CleanTarget { paths: vec!["build/temp".into()] });
        assert!(targets.contains(OperationKind::Clean, &TargetName::from("temp")));
        assert!(!targets.contains(OperationKind::Copy, &TargetName::from("temp")));
    }
}
