//! Metadata composition — merges descriptor objects into one context.
//!
//! Merging is shallow: each source overwrites earlier sources at the same
//! top-level key, whatever the value's type. Nested objects are replaced
//! wholesale, never merged.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{io_err, ConfigError};

/// An immutable key/value context built from descriptor sources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Dot-path lookup (`meta.author.name`). Empty segments never match.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Metadata {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ConfigError::NotAnObject {
                source_name: "<inline>".to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Compose
// ---------------------------------------------------------------------------

/// Shallow-merge `sources` in order; the later source wins per top-level key.
///
/// Fails with [`ConfigError::NotAnObject`] if any source is not an object.
pub fn compose<I>(sources: I) -> Result<Metadata, ConfigError>
where
    I: IntoIterator<Item = Value>,
{
    let mut acc = Map::new();
    for (index, source) in sources.into_iter().enumerate() {
        let Value::Object(map) = source else {
            return Err(ConfigError::NotAnObject {
                source_name: format!("#{index}"),
            });
        };
        for (key, value) in map {
            acc.insert(key, value);
        }
    }
    Ok(Metadata(acc))
}

/// Read and parse a single JSON descriptor.
pub fn load_descriptor(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let value: Value =
        serde_json::from_str(&contents).map_err(|e| ConfigError::DescriptorParse {
            path: path.to_path_buf(),
            source: e,
        })?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject {
            source_name: path.display().to_string(),
        });
    }
    Ok(value)
}

/// Load each descriptor (relative to `root`) and compose them in order.
pub fn compose_files<P: AsRef<Path>>(root: &Path, paths: &[P]) -> Result<Metadata, ConfigError> {
    let sources = paths
        .iter()
        .map(|p| load_descriptor(&root.join(p.as_ref())))
        .collect::<Result<Vec<_>, _>>()?;
    compose(sources)
}

/// Build the resolution context: one top-level key per namespace, each the
/// composition of that namespace's descriptor list.
pub fn build_context(
    root: &Path,
    namespaces: &BTreeMap<String, Vec<String>>,
) -> Result<Metadata, ConfigError> {
    let mut ctx = Map::new();
    for (namespace, paths) in namespaces {
        let composed = compose_files(root, paths)?;
        ctx.insert(namespace.clone(), composed.into_value());
    }
    Ok(Metadata(ctx))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
