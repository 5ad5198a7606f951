//! # kiln-renderer
//!
//! Placeholder resolution and per-file content transforms.
//!
//! ## Usage
//!
//! ```rust
//! use kiln_core::Metadata;
//! use kiln_renderer::resolve;
//! use serde_json::json;
//!
//! let ctx = Metadata::try_from(json!({"meta": {"name": "x", "version": "1.0"}})).unwrap();
//! let out = resolve("<%= meta.name %>-<%= meta.version %>.zip", &ctx).unwrap();
//! assert_eq!(out, "x-1.0.zip");
//! ```

pub mod error;
pub mod template;
pub mod transform;

pub use error::RenderError;
pub use template::resolve;
pub use transform::{apply, rewrite_demo_path, DEMO_PATH_RULES};
