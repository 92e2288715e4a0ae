use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::domain::{AttrGroup, Schema, SchemaNode};
use crate::path::{AttrPath, PathError};

use super::{TEMPLATE_ITEM_NAME, array_default_key, compose_templates, item_name};

/// Copy the style values of `input` into `out` at `path`, walking in step
/// with `group`.
///
/// Skipped: keys without schema, `null`s, untemplatable attributes, data
/// arrays and per-point values of `arrayOk` attributes. In container
/// arrays each uniquely named item is kept (renumbered from 0) and the
/// first unnamed item becomes the array's defaults entry.
pub fn walk_style_keys(
    input: &Map<String, Value>,
    group: &AttrGroup,
    out: &mut Value,
    path: &AttrPath,
) -> Result<(), PathError> {
    for (key, value) in input {
        if value.is_null() {
            continue;
        }
        let Some(node) = group.get(key) else {
            continue;
        };
        match node {
            SchemaNode::Value(descriptor) => {
                if descriptor.no_templating
                    || descriptor.is_data()
                    || (descriptor.array_ok && value.is_array())
                {
                    continue;
                }
                path.key(key).set(out, Some(value.clone()))?;
            }
            SchemaNode::Group(child) => {
                if child.no_templating {
                    continue;
                }
                if let Value::Object(child_input) = value {
                    walk_style_keys(child_input, child, out, &path.key(key))?;
                }
            }
            SchemaNode::Array(array) => {
                if array.item.no_templating {
                    continue;
                }
                if let Value::Array(items) = value {
                    walk_items(items, &array.item, out, path, key)?;
                }
            }
        }
    }
    Ok(())
}

fn walk_items(
    items: &[Value],
    item_group: &AttrGroup,
    out: &mut Value,
    path: &AttrPath,
    key: &str,
) -> Result<(), PathError> {
    let mut names: HashSet<&str> = HashSet::new();
    let mut named = 0;
    let mut defaults_taken = false;
    for item in items {
        let Value::Object(item_input) = item else {
            continue;
        };
        match item_name(item_input.get("name")) {
            Some(name) => {
                if !names.insert(name) {
                    continue;
                }
                let mut style = Value::Object(Map::new());
                walk_style_keys(item_input, item_group, &mut style, &AttrPath::root())?;
                path.key(key).index(named).set(out, Some(style))?;
                named += 1;
            }
            None if !defaults_taken => {
                defaults_taken = true;
                let mut style = Value::Object(Map::new());
                walk_style_keys(item_input, item_group, &mut style, &AttrPath::root())?;
                if style.as_object().is_some_and(|style| !style.is_empty()) {
                    path.key(array_default_key(key)).set(out, Some(style))?;
                }
            }
            None => {}
        }
    }
    Ok(())
}

fn extract_raw(figure: &Value, schema: &Schema) -> Result<Value, PathError> {
    let mut data: Map<String, Value> = Map::new();
    if let Some(Value::Array(traces)) = figure.get("data") {
        for trace in traces {
            let Value::Object(trace_input) = trace else {
                continue;
            };
            let Some(trace_type) = schema.resolve_trace_type(trace_input.get("type")) else {
                continue;
            };
            let Some(attrs) = schema.trace(trace_type) else {
                continue;
            };
            let mut style = Value::Object(Map::new());
            walk_style_keys(trace_input, attrs, &mut style, &AttrPath::root())?;
            if let Value::Array(list) = data
                .entry(trace_type.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                list.push(style);
            }
        }
    }

    let mut layout = Value::Object(Map::new());
    if let Some(Value::Object(layout_input)) = figure.get("layout") {
        walk_style_keys(layout_input, &schema.layout, &mut layout, &AttrPath::root())?;
    }
    if let Value::Object(layout) = &mut layout {
        layout.shift_remove("template");
    }

    let mut template = Map::new();
    template.insert("data".to_string(), Value::Object(data));
    template.insert("layout".to_string(), layout);
    Ok(Value::Object(template))
}

/// Pull the style values of `figure` (`{data, layout}`) into a fresh
/// template document.
pub fn extract_template(figure: &Value, schema: &Schema) -> Result<Value, PathError> {
    let mut template = extract_raw(figure, schema)?;
    strip_item_names(&mut template);
    Ok(template)
}

/// Extract a template from `figure` and compose it with the template the
/// figure already carries in `layout.template`, if any.
pub fn make_template(figure: &Value, schema: &Schema) -> Result<Value, PathError> {
    let mut template = extract_raw(figure, schema)?;
    if let Some(old) = figure
        .get("layout")
        .and_then(|layout| layout.get("template"))
        .filter(|old| old.is_object())
    {
        compose_templates(old, &mut template);
    }
    strip_item_names(&mut template);
    Ok(template)
}

/// Remove the template cross-reference from every array item.
fn strip_item_names(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(strip_item_names),
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    map.shift_remove(TEMPLATE_ITEM_NAME);
                }
                strip_item_names(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{ArraySchema, Descriptor, ValueKind};

    fn annotation() -> AttrGroup {
        AttrGroup::new()
            .with_value("name", Descriptor::new(ValueKind::String))
            .with_value("templateitemname", Descriptor::new(ValueKind::String))
            .with_value("text", Descriptor::new(ValueKind::String))
            .with_value("arrowcolor", Descriptor::new(ValueKind::Color))
    }

    fn schema() -> Schema {
        let axis = AttrGroup::new()
            .subplot()
            .with_value("color", Descriptor::new(ValueKind::Color));
        let layout = AttrGroup::new()
            .with_value("paper_bgcolor", Descriptor::new(ValueKind::Color))
            .with_value("title", Descriptor::new(ValueKind::String))
            .with_attr("xaxis", SchemaNode::Group(axis))
            .with_attr(
                "annotations",
                SchemaNode::Array(ArraySchema {
                    item_name: "annotation".into(),
                    item: annotation(),
                }),
            );
        let marker = AttrGroup::new()
            .with_value("color", Descriptor::new(ValueKind::Color).array_ok())
            .with_value("size", Descriptor::new(ValueKind::Number).array_ok());
        let scatter = AttrGroup::new()
            .with_value("x", Descriptor::new(ValueKind::DataArray))
            .with_value("mode", Descriptor::new(ValueKind::String))
            .with_attr("marker", SchemaNode::Group(marker));
        let bar = AttrGroup::new().with_value("opacity", Descriptor::new(ValueKind::Number));
        Schema::new(layout)
            .with_trace("scatter", scatter)
            .with_trace("bar", bar)
    }

    #[test]
    fn data_and_per_point_values_are_skipped() {
        let figure = json!({
            "data": [
                {"type": "scatter", "x": [1, 2], "mode": "lines",
                 "marker": {"color": ["red", "blue"], "size": 4}},
                {"type": "bar", "opacity": 0.5, "unknown": 1},
                {"mode": "markers"},
            ],
        });
        let template = extract_template(&figure, &schema()).unwrap();
        assert_eq!(
            template,
            json!({
                "data": {
                    "scatter": [{"mode": "lines", "marker": {"size": 4}}, {"mode": "markers"}],
                    "bar": [{"opacity": 0.5}],
                },
                "layout": {},
            })
        );
    }

    #[test]
    fn container_items_split_into_named_and_defaults() {
        let figure = json!({
            "layout": {
                "paper_bgcolor": "#eee",
                "xaxis2": {"color": "#333"},
                "annotations": [
                    {"text": "first", "arrowcolor": "red"},
                    {"name": "logo", "text": "L", "templateitemname": "base"},
                    {"text": "second", "arrowcolor": "blue"},
                    {"name": "logo", "text": "again"},
                    {"name": "stamp", "text": "S"},
                ],
            },
        });
        let template = extract_template(&figure, &schema()).unwrap();
        assert_eq!(
            template["layout"],
            json!({
                "paper_bgcolor": "#eee",
                "xaxis2": {"color": "#333"},
                "annotationdefaults": {"text": "first", "arrowcolor": "red"},
                "annotations": [
                    {"name": "logo", "text": "L"},
                    {"name": "stamp", "text": "S"},
                ],
            })
        );
    }

    #[test]
    fn existing_template_is_composed() {
        let figure = json!({
            "data": [{"type": "bar", "opacity": 0.5}],
            "layout": {
                "title": "new",
                "template": {
                    "data": {
                        "bar": [{"opacity": 0.1}, {"opacity": 0.2}],
                        "scatter": [{"mode": "lines"}],
                    },
                    "layout": {"title": "old", "paper_bgcolor": "#fff"},
                },
            },
        });
        let template = make_template(&figure, &schema()).unwrap();
        assert_eq!(
            template,
            json!({
                "data": {
                    "bar": [{"opacity": 0.5}, {"opacity": 0.2}],
                    "scatter": [{"mode": "lines"}],
                },
                "layout": {"title": "new", "paper_bgcolor": "#fff"},
            })
        );
    }

    #[test]
    fn layout_template_is_never_extracted() {
        let schema = Schema::new(
            AttrGroup::new().with_value("template", Descriptor::new(ValueKind::Any)),
        );
        let figure = json!({"layout": {"template": {"layout": {}}}});
        assert_eq!(
            extract_template(&figure, &schema).unwrap(),
            json!({"data": {}, "layout": {}})
        );
    }
}
