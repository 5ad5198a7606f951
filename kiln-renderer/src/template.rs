//! `<%= expr %>` placeholder resolution.
//!
//! `expr` is a dot-path into the metadata context. Values are stringified as:
//! strings verbatim, numbers and booleans in JSON spelling, `null` empty,
//! arrays comma-joined, objects as compact JSON.

use serde_json::Value;

use kiln_core::Metadata;

use crate::error::RenderError;

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// Resolve every placeholder in `template`, left to right.
///
/// Any missing path fails the whole call; no partially substituted string is
/// ever returned. An opening `<%=` with no closing `%>` is kept literally.
pub fn resolve(template: &str, ctx: &Metadata) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let expr = after_open[..end].trim();
        let value = ctx
            .lookup(expr)
            .ok_or_else(|| RenderError::UnresolvedPlaceholder {
                expr: expr.to_owned(),
                template: template.to_owned(),
            })?;
        out.push_str(&rest[..start]);
        out.push_str(&stringify(value));
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
    }
}
