//! Pipeline file loading.
//!
//! A project may ship its own `kiln.yaml`; otherwise the pipeline embedded in
//! the binary (the calendar widget's release pipeline) is used.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::PipelineConfig;

/// File name looked up in the project root when no explicit path is given.
pub const DEFAULT_FILE_NAME: &str = "kiln.yaml";

/// The built-in pipeline, baked into the binary at compile time.
pub const BUILTIN_PIPELINE: &str = include_str!("pipeline/builtin.yaml");

/// Where a loaded pipeline came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    File(PathBuf),
    Builtin,
}

/// Parse pipeline YAML; `origin` is only used for error messages.
pub fn parse(contents: &str, origin: &Path) -> Result<PipelineConfig, ConfigError> {
    serde_yaml::from_str(contents).map_err(|e| ConfigError::PipelineParse {
        path: origin.to_path_buf(),
        source: e,
    })
}

/// Load a pipeline file from disk.
pub fn load_at(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse(&contents, path)
}

/// The embedded pipeline.
pub fn builtin() -> Result<PipelineConfig, ConfigError> {
    parse(BUILTIN_PIPELINE, Path::new("<builtin>"))
}

/// Resolve the pipeline for a project root.
///
/// An explicit path must exist. Otherwise `<root>/kiln.yaml` is used when
/// present, falling back to the built-in pipeline.
pub fn discover(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<(PipelineConfig, PipelineSource), ConfigError> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        return Ok((load_at(&path)?, PipelineSource::File(path)));
    }
    let candidate = root.join(DEFAULT_FILE_NAME);
    if candidate.exists() {
        return Ok((load_at(&candidate)?, PipelineSource::File(candidate)));
    }
    Ok((builtin()?, PipelineSource::Builtin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use crate::types::TaskName;
    use tempfile::TempDir;

    #[test]
    fn builtin_pipeline_builds_a_valid_registry() {
        let config = builtin().expect("builtin parses");
        let registry = RegistryBuilder::from_config(&config).build().expect("registry");
        for name in ["default", "dev", "modules", "languages", "archive", "cdnjs", "check"] {
            assert!(registry.contains(&TaskName::from(name)), "missing task {name}");
        }
    }

    #[test]
    fn builtin_default_is_an_alias_of_archive() {
        let config = builtin().unwrap();
        let registry = RegistryBuilder::from_config(&config).build().unwrap();
        assert_eq!(
            registry.expand(&TaskName::from("default")).unwrap(),
            registry.expand(&TaskName::from("archive")).unwrap()
        );
    }

    #[test]
    fn builtin_archive_cleans_first_and_compresses_last() {
        let config = builtin().unwrap();
        let registry = RegistryBuilder::from_config(&config).build().unwrap();
        let ops = registry.expand(&TaskName::from("archive")).unwrap();
        assert_eq!(ops.first().map(|o| o.to_string()).as_deref(), Some("clean:archive"));
        assert_eq!(ops.last().map(|o| o.to_string()).as_deref(), Some("compress:archive"));
    }

    #[test]
    fn discover_prefers_project_file() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join(DEFAULT_FILE_NAME), "tasks:\n  only: []\n").unwrap();
        let (config, source) = discover(root.path(), None).unwrap();
        assert!(matches!(source, PipelineSource::File(_)));
        assert_eq!(config.tasks.len(), 1);
    }

    #[test]
    fn discover_falls_back_to_builtin() {
        let root = TempDir::new().unwrap();
        let (_, source) = discover(root.path(), None).unwrap();
        assert_eq!(source, PipelineSource::Builtin);
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = discover(root.path(), Some(Path::new("other.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse("tasks: [unclosed", Path::new("kiln.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::PipelineParse { .. }));
        assert!(err.to_string().contains("kiln.yaml"));
    }
}
