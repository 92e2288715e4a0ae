//! Resolving a whole figure: every declared attribute coerced, with the
//! figure's template as the second source of defaults.

use serde_json::{Map, Value};

use crate::coerce::coerce_with_template;
use crate::domain::{ArraySchema, AttrGroup, Schema, SchemaNode};
use crate::options::EngineOptions;
use crate::path::base_key;
use crate::template::{
    ArrayTemplater, ItemTemplate, TEMPLATE_ITEM_NAME, TraceTemplater, container_template,
};

/// Resolve `figure` (`{data, layout}`) against `schema`, using the
/// template in `layout.template` if there is one.
pub fn resolve_figure(figure: &Value, schema: &Schema, options: &EngineOptions) -> Value {
    let template = figure
        .get("layout")
        .and_then(|layout| layout.get("template"))
        .filter(|template| template.is_object());
    resolve_with_template(figure, template, schema, options)
}

/// Resolve `figure` with an explicitly supplied template document.
pub fn resolve_with_template(
    figure: &Value,
    template: Option<&Value>,
    schema: &Schema,
    options: &EngineOptions,
) -> Value {
    let resolver = Resolver { options };

    let mut traces = TraceTemplater::new(template.and_then(|template| template.get("data")));
    let mut data = Vec::new();
    if let Some(Value::Array(inputs)) = figure.get("data") {
        for input in inputs {
            let input = input.as_object();
            let Some(trace_type) =
                schema.resolve_trace_type(input.and_then(|input| input.get("type")))
            else {
                continue;
            };
            let Some(attrs) = schema.trace(trace_type) else {
                continue;
            };
            let mut trace = Map::new();
            trace.insert("type".to_string(), Value::String(trace_type.to_string()));
            trace.extend(resolver.group(input, attrs, traces.next(trace_type)));
            data.push(Value::Object(trace));
        }
    }

    let layout_template = template
        .and_then(|template| template.get("layout"))
        .filter(|layout| layout.is_object());
    let layout = resolver.group(
        figure.get("layout").and_then(Value::as_object),
        &schema.layout,
        layout_template,
    );

    let mut resolved = Map::new();
    resolved.insert("data".to_string(), Value::Array(data));
    resolved.insert("layout".to_string(), Value::Object(layout));
    Value::Object(resolved)
}

struct Resolver<'a> {
    options: &'a EngineOptions,
}

impl Resolver<'_> {
    fn group(
        &self,
        input: Option<&Map<String, Value>>,
        group: &AttrGroup,
        template: Option<&Value>,
    ) -> Map<String, Value> {
        let template = template.filter(|_| !group.no_templating);
        let mut out = Map::new();
        for (key, node) in &group.attrs {
            let value = input.and_then(|input| input.get(key));
            match node {
                SchemaNode::Value(descriptor) => {
                    let template = template
                        .filter(|_| !descriptor.no_templating)
                        .and_then(|template| template.get(key));
                    if let Some(coerced) = coerce_with_template(value, template, descriptor, None) {
                        out.insert(key.clone(), coerced);
                    }
                }
                SchemaNode::Group(child) => {
                    let resolved = self.group(
                        value.and_then(Value::as_object),
                        child,
                        container_template(template, key),
                    );
                    out.insert(key.clone(), Value::Object(resolved));
                    if child.subplot {
                        self.numbered(input, group, key, template, &mut out);
                    }
                }
                SchemaNode::Array(array) => {
                    let items = self.array(value, array, key, template);
                    out.insert(key.clone(), Value::Array(items));
                }
            }
        }

        if let Some(input) = input {
            for (key, value) in input {
                if key.starts_with('_') {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Resolve numbered copies of a subplot group (`xaxis2`, `xaxis3`)
    /// present in the input.
    fn numbered(
        &self,
        input: Option<&Map<String, Value>>,
        parent: &AttrGroup,
        base: &str,
        template: Option<&Value>,
        out: &mut Map<String, Value>,
    ) {
        let (Some(input), Some(SchemaNode::Group(group))) = (input, parent.attrs.get(base)) else {
            return;
        };
        for (key, value) in input {
            if !is_numbered(key, base) || parent.attrs.contains_key(key) {
                continue;
            }
            let resolved = self.group(value.as_object(), group, container_template(template, key));
            out.insert(key.clone(), Value::Object(resolved));
        }
    }

    fn array(
        &self,
        input: Option<&Value>,
        array: &ArraySchema,
        key: &str,
        template: Option<&Value>,
    ) -> Vec<Value> {
        let mut templater = ArrayTemplater::new(template, key);
        let inputs = input.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let inclusion = self.options.inclusion_attr.as_str();

        let mut items = Vec::with_capacity(inputs.len());
        for (index, item_input) in inputs.iter().enumerate() {
            let mut item = match item_input {
                Value::Object(fields) => {
                    let selected = templater.new_item(item_input);
                    let mut item = self.group(Some(fields), &array.item, selected.template());
                    if !fields.contains_key("name") {
                        // names come from the input only
                        item.shift_remove("name");
                    }
                    if selected == ItemTemplate::Missing {
                        let shown = fields.get(inclusion) == Some(&Value::Bool(true));
                        item.insert(inclusion.to_string(), Value::Bool(shown));
                    }
                    item
                }
                _ => {
                    let mut item = self.group(None, &array.item, None);
                    item.shift_remove("name");
                    item.insert(inclusion.to_string(), Value::Bool(false));
                    item
                }
            };
            item.insert("_index".to_string(), Value::from(index));
            items.push(Value::Object(item));
        }

        for entry in templater.default_items() {
            let mut item = self.group(None, &array.item, Some(entry));
            if let Some(name) = entry.get("name") {
                item.insert("name".to_string(), name.clone());
                item.insert(TEMPLATE_ITEM_NAME.to_string(), name.clone());
            }
            item.insert("_index".to_string(), Value::from(items.len()));
            items.push(Value::Object(item));
        }
        items
    }
}

/// `xaxis2` and `xaxis13` are numbered copies of `xaxis`; `xaxis1` and
/// `xaxis02` are not.
fn is_numbered(key: &str, base: &str) -> bool {
    if base_key(key) != base || key.len() == base.len() {
        return false;
    }
    let suffix = &key[base.len()..];
    !suffix.starts_with('0') && suffix != "1"
}
