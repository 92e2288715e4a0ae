//! Style templates: extracting them from figures, composing them, and
//! selecting the template part that applies to each container.
//!
//! A template document mirrors a figure:
//!
//! ```text
//! {"data": {"<trace type>": [<trace template>, ...]}, "layout": {...}}
//! ```
//!
//! Container arrays in a template hold named entries plus one unnamed
//! default entry under `<singular>defaults` (`annotationdefaults`).

mod apply;
mod extract;
mod merge;
mod validate;

pub use apply::{ArrayTemplater, ItemTemplate, TraceTemplater, container_template};
pub use extract::{extract_template, make_template, walk_style_keys};
pub use merge::{compose_templates, merge_templates};
pub use validate::{TemplateIssue, validate_template};

/// Item key binding a figure's item to a named template entry.
pub const TEMPLATE_ITEM_NAME: &str = "templateitemname";

/// Key of the default entry for the container array `name`.
///
/// `annotations` becomes `annotationdefaults`. Names not ending in `s` are
/// still truncated by one character, with a warning.
pub fn array_default_key(name: &str) -> String {
    if !name.ends_with('s') {
        tracing::warn!(container = name, "container array name does not end in 's'");
    }
    let mut chars = name.chars();
    chars.next_back();
    format!("{}defaults", chars.as_str())
}

/// Item names must be non-empty strings.
pub(crate) fn item_name(value: Option<&serde_json::Value>) -> Option<&str> {
    value.and_then(serde_json::Value::as_str).filter(|name| !name.is_empty())
}
