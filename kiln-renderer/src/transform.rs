//! Per-file content transforms selected by a file set's `transform` option.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use kiln_core::{ContentTransform, Metadata};

use crate::error::RenderError;
use crate::template;

/// Ordered literal rewrites turning development paths in demo pages into the
/// archive layout. Every rule is tried on every value, top to bottom, and
/// replaces the first occurrence only.
pub const DEMO_PATH_RULES: &[(&str, &str)] = &[
    ("../lib/moment/moment.js", "../lib/moment.min.js"),
    ("../lib/jquery/jquery.js", "../lib/jquery.min.js"),
    ("../lib/jquery-ui/ui/jquery-ui.js", "../lib/jquery-ui.custom.min.js"),
    ("../lib/jquery-ui/themes/cupertino/", "../lib/cupertino/"),
    ("../dist/", "../"),
    ("/fullcalendar.js", "/fullcalendar.min.js"),
];

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"((?:src|href)=['"])([^'"]*)(['"])"#).expect("attribute pattern is valid")
    })
}

/// Apply [`DEMO_PATH_RULES`] to a single attribute value.
pub fn rewrite_demo_path(path: &str) -> String {
    DEMO_PATH_RULES
        .iter()
        .fold(path.to_owned(), |acc, (from, to)| acc.replacen(from, to, 1))
}

/// Rewrite every quoted `src=`/`href=` value in an HTML document.
pub fn rewrite_demo_attributes(content: &str) -> String {
    attribute_regex()
        .replace_all(content, |caps: &Captures<'_>| {
            format!("{}{}{}", &caps[1], rewrite_demo_path(&caps[2]), &caps[3])
        })
        .into_owned()
}

/// Run `transform` over a file's text.
pub fn apply(
    transform: ContentTransform,
    content: &str,
    ctx: &Metadata,
) -> Result<String, RenderError> {
    match transform {
        ContentTransform::None => Ok(content.to_owned()),
        ContentTransform::Template => template::resolve(content, ctx),
        ContentTransform::DemoPaths => Ok(rewrite_demo_attributes(content)),
    }
}
