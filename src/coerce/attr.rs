use serde_json::{Map, Value};

use crate::domain::{AttrGroup, NodeRef};
use crate::path::{AttrPath, PathError};

use super::{coerce_with_template, present};

#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("no attribute descriptor at '{0}'")]
    UnknownAttribute(String),
}

/// Coerces attributes of one input container into an output container.
///
/// Each call reads the input (and the template) at an attribute path,
/// coerces the value against the group's descriptor at that path and
/// writes the result to the same path of the output.
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'a> {
    attrs: &'a AttrGroup,
    input: &'a Value,
    template: Option<&'a Value>,
}

impl<'a> Coercer<'a> {
    pub fn new(attrs: &'a AttrGroup, input: &'a Value) -> Self {
        Self {
            attrs,
            input,
            template: None,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: Option<&'a Value>) -> Self {
        self.template = template;
        self
    }

    pub fn template(&self) -> Option<&'a Value> {
        self.template
    }

    pub fn coerce(
        &self,
        output: &mut Value,
        attr: &str,
        dflt: Option<&Value>,
    ) -> Result<Option<Value>, CoerceError> {
        let path = AttrPath::parse(attr)?;
        let descriptor = match self.attrs.node_at(path.steps()) {
            Some(NodeRef::Value(descriptor)) => descriptor,
            _ => return Err(CoerceError::UnknownAttribute(attr.to_string())),
        };

        let value = path.get(self.input);
        let template = if descriptor.no_templating {
            None
        } else {
            self.template.and_then(|template| path.get(template))
        };
        let coerced = coerce_with_template(value.as_ref(), template.as_ref(), descriptor, dflt);
        path.set(output, coerced.clone())?;
        Ok(coerced)
    }

    /// Like [`Coercer::coerce`], but only reports the value when the input
    /// supplied one.
    pub fn coerce2(
        &self,
        output: &mut Value,
        attr: &str,
        dflt: Option<&Value>,
    ) -> Result<Option<Value>, CoerceError> {
        let coerced = self.coerce(output, attr, dflt)?;
        let path = AttrPath::parse(attr)?;
        let supplied = present(path.get(self.input).as_ref()).is_some();
        Ok(coerced.filter(|_| supplied))
    }

    /// Coerce the `family`, `size` and `color` of a font attribute.
    ///
    /// Defaults come from the matching keys of `dflt`.
    pub fn coerce_font(
        &self,
        output: &mut Value,
        attr: &str,
        dflt: Option<&Value>,
    ) -> Result<Value, CoerceError> {
        let mut font = Map::new();
        for part in ["family", "size", "color"] {
            let part_default = dflt.and_then(|dflt| dflt.get(part));
            if let Some(value) = self.coerce(output, &format!("{attr}.{part}"), part_default)? {
                font.insert(part.to_string(), value);
            }
        }
        Ok(Value::Object(font))
    }
}
