//! Error types for kiln-renderer.

use thiserror::Error;

/// All errors that can arise while resolving templates.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A `<%= expr %>` dot-path does not exist in the metadata context.
    #[error("unresolved placeholder '<%= {expr} %>' in \"{template}\"")]
    UnresolvedPlaceholder { expr: String, template: String },
}
