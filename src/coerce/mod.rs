//! Coercing raw input values into schema-conformant values.
//!
//! Invalid user input never fails: it is replaced by a default, taken from
//! the attached template first and the descriptor second.

mod attr;
mod color;
mod kinds;
mod palettes;

use serde_json::Value;

use crate::domain::Descriptor;

pub use attr::{CoerceError, Coercer};
pub use color::{
    default_scale, is_valid_color, is_valid_color_list, is_valid_scale_array, palette_scale,
    parse_scale,
};
pub use kinds::{Coerced, KindHandler, handler};
pub use palettes::palette_names;

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

/// Run the kind handler, honoring the `arrayOk` escape hatch.
pub fn check(value: &Value, descriptor: &Descriptor) -> Coerced {
    if descriptor.array_ok && value.is_array() {
        return Coerced::Valid(value.clone());
    }
    handler(descriptor.kind).coerce(value, descriptor)
}

/// Coerce `value` against `descriptor`.
///
/// `dflt` overrides the descriptor's own default. Absent and `null` input
/// both resolve to the default.
pub fn coerce_value(
    value: Option<&Value>,
    descriptor: &Descriptor,
    dflt: Option<&Value>,
) -> Option<Value> {
    let dflt = dflt.or(descriptor.dflt.as_ref());
    let kind = handler(descriptor.kind);
    match present(value) {
        Some(value) => check(value, descriptor)
            .into_value()
            .or_else(|| kind.default_value(dflt)),
        None => kind.default_value(dflt),
    }
}

/// Whether `value` would be kept unchanged by [`coerce_value`].
pub fn validate(value: &Value, descriptor: &Descriptor) -> bool {
    check(value, descriptor).is_valid()
}

/// Coerce with a template value as second source: explicit, then template,
/// then the static default.
///
/// The template value is also used when the explicit value is rejected.
pub fn coerce_with_template(
    value: Option<&Value>,
    template: Option<&Value>,
    descriptor: &Descriptor,
    dflt: Option<&Value>,
) -> Option<Value> {
    if let Some(value) = present(value)
        && let Some(coerced) = check(value, descriptor).into_value()
    {
        return Some(coerced);
    }
    coerce_value(present(template), descriptor, dflt)
}
