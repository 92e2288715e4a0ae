use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use serde_json::{Map, Value};

use super::descriptor::{Descriptor, Dimensions, EnumValue, InfoItems, ValueKind};
use super::schema::{ArraySchema, AttrGroup, Schema, SchemaNode};

/// Keys of attribute groups that document the group rather than declare
/// attributes.
const DOC_KEYS: &[&str] = &["description", "role", "editType"];

/// Parse a plot-schema document into the internal [`Schema`].
///
/// Expected shape:
/// `{"traces": {"<type>": {"attributes": {..}}}, "layout": {"layoutAttributes": {..}}}`.
pub fn parse_schema(value: &Value) -> Result<Schema> {
    let root = value
        .as_object()
        .context("schema document must be an object")?;

    let layout = match root.get("layout") {
        Some(layout) => {
            let attributes = layout
                .get("layoutAttributes")
                .and_then(Value::as_object)
                .context("layout must define an object 'layoutAttributes'")?;
            parse_group(attributes, "layout")?
        }
        None => AttrGroup::new(),
    };

    let mut schema = Schema::new(layout);
    if let Some(traces) = root.get("traces") {
        let traces = traces
            .as_object()
            .context("'traces' must map trace types to definitions")?;
        for (trace_type, definition) in traces {
            let attributes = definition
                .get("attributes")
                .and_then(Value::as_object)
                .with_context(|| format!("trace type '{trace_type}' must define 'attributes'"))?;
            let group = parse_group(attributes, trace_type)
                .with_context(|| format!("failed to parse trace type '{trace_type}'"))?;
            schema.traces.insert(trace_type.clone(), group);
        }
    }
    Ok(schema)
}

fn is_metadata_key(key: &str) -> bool {
    key.starts_with('_') || DOC_KEYS.contains(&key)
}

fn parse_group(map: &Map<String, Value>, path: &str) -> Result<AttrGroup> {
    let mut group = AttrGroup {
        subplot: flag(map, "_isSubplotObj"),
        no_templating: flag(map, "_noTemplating"),
        ..AttrGroup::default()
    };

    for (key, node) in map {
        if is_metadata_key(key) {
            continue;
        }
        // trace modules name themselves with a plain `type` string
        if key == "type" && node.is_string() {
            continue;
        }
        let child_path = format!("{path}.{key}");
        let Some(object) = node.as_object() else {
            bail!("attribute '{child_path}' must be an object");
        };
        let parsed = parse_node(key, object, &child_path)?;
        group.attrs.insert(key.clone(), parsed);
    }
    Ok(group)
}

fn parse_node(key: &str, object: &Map<String, Value>, path: &str) -> Result<SchemaNode> {
    if object.contains_key("valType") || object.contains_key("kind") {
        return parse_descriptor(object, path).map(SchemaNode::Value);
    }

    if object.get("role").and_then(Value::as_str) == Some("object")
        && let Some(items) = object.get("items").and_then(Value::as_object)
    {
        let Some((item_name, item)) = items.iter().next() else {
            bail!("container array '{path}' declares no item schema");
        };
        let item = item
            .as_object()
            .with_context(|| format!("item schema of '{path}' must be an object"))?;
        return Ok(SchemaNode::Array(ArraySchema {
            item_name: item_name.clone(),
            item: parse_item_group(item, path)?,
        }));
    }

    let linked = object
        .get("_isLinkedToArray")
        .or_else(|| object.get("linkedArrayItemName"));
    if let Some(linked) = linked {
        let item_name = match linked {
            Value::String(name) => name.clone(),
            Value::Bool(true) => key.strip_suffix('s').unwrap_or(key).to_string(),
            other => bail!("'{path}' has an invalid array item name: {other}"),
        };
        return Ok(SchemaNode::Array(ArraySchema {
            item_name,
            item: parse_item_group(object, path)?,
        }));
    }

    parse_group(object, path).map(SchemaNode::Group)
}

/// Item groups always accept `name` and `templateitemname`, which tie
/// items to named template entries.
fn parse_item_group(map: &Map<String, Value>, path: &str) -> Result<AttrGroup> {
    let mut group = parse_group(map, &format!("{path}[]"))?;
    for key in ["name", "templateitemname"] {
        group
            .attrs
            .entry(key.to_string())
            .or_insert_with(|| SchemaNode::Value(Descriptor::new(ValueKind::String)));
    }
    Ok(group)
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn number(map: &Map<String, Value>, key: &str, path: &str) -> Result<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("'{path}.{key}' must be numeric")),
    }
}

fn parse_descriptor(map: &Map<String, Value>, path: &str) -> Result<Descriptor> {
    let tag = map
        .get("valType")
        .or_else(|| map.get("kind"))
        .and_then(Value::as_str)
        .with_context(|| format!("'{path}' must declare a string valType"))?;
    let kind =
        ValueKind::from_tag(tag).ok_or_else(|| anyhow!("'{path}' has unknown valType '{tag}'"))?;

    let mut descriptor = Descriptor::new(kind);
    descriptor.dflt = map.get("dflt").or_else(|| map.get("default")).cloned();
    descriptor.min = number(map, "min", path)?;
    descriptor.max = number(map, "max", path)?;
    descriptor.coerce_number = flag(map, "coerceNumber");
    descriptor.array_ok = flag(map, "arrayOk");
    descriptor.strict = flag(map, "strict");
    descriptor.no_blank = flag(map, "noBlank");
    descriptor.free_length = flag(map, "freeLength");
    descriptor.no_templating = flag(map, "_noTemplating");
    if let Some(info) = map.get("isInfoArray").and_then(Value::as_bool) {
        descriptor.is_info_array = info;
    }

    if let Some(values) = map.get("values") {
        let values = values
            .as_array()
            .with_context(|| format!("'{path}.values' must be an array"))?;
        descriptor.values = values
            .iter()
            .map(|value| parse_enum_value(value, path))
            .collect::<Result<_>>()?;
    }

    if let Some(flags) = map.get("flags") {
        descriptor.flags = flags
            .as_array()
            .with_context(|| format!("'{path}.flags' must be an array"))?
            .iter()
            .map(|flag| {
                flag.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("'{path}.flags' must only hold strings"))
            })
            .collect::<Result<_>>()?;
    }
    if let Some(extras) = map.get("extras").and_then(Value::as_array) {
        descriptor.extras = extras.clone();
    }

    if let Some(regex) = map.get("regex").and_then(Value::as_str) {
        descriptor.regex = Some(
            Regex::new(regex).with_context(|| format!("'{path}.regex' is not a valid pattern"))?,
        );
    }

    descriptor.dimensions = match map.get("dimensions") {
        None => Dimensions::One,
        Some(value) if value.as_u64() == Some(1) => Dimensions::One,
        Some(value) if value.as_u64() == Some(2) => Dimensions::Two,
        Some(Value::String(raw)) if raw == "1-2" => Dimensions::OneOrTwo,
        Some(other) => bail!("'{path}.dimensions' must be 1, 2 or \"1-2\", found {other}"),
    };

    if let Some(items) = map.get("items") {
        descriptor.items = Some(parse_info_items(items, path)?);
    } else if kind == ValueKind::InfoArray {
        bail!("info_array '{path}' requires 'items'");
    }

    Ok(descriptor)
}

fn parse_enum_value(value: &Value, path: &str) -> Result<EnumValue> {
    if let Value::String(raw) = value
        && raw.len() >= 2
        && raw.starts_with('/')
        && raw.ends_with('/')
    {
        let pattern = Regex::new(&raw[1..raw.len() - 1])
            .with_context(|| format!("'{path}.values' holds an invalid pattern {raw}"))?;
        return Ok(EnumValue::Pattern(pattern));
    }
    Ok(EnumValue::Literal(value.clone()))
}

fn item_descriptor(value: &Value, path: &str) -> Result<Descriptor> {
    let object = value
        .as_object()
        .with_context(|| format!("'{path}.items' entries must be descriptors"))?;
    parse_descriptor(object, &format!("{path}.items"))
}

fn parse_info_items(items: &Value, path: &str) -> Result<InfoItems> {
    match items {
        Value::Object(_) => Ok(InfoItems::Shared(Box::new(item_descriptor(items, path)?))),
        Value::Array(entries) if !entries.is_empty() && entries.iter().all(Value::is_array) => {
            let rows = entries
                .iter()
                .map(|row| {
                    row.as_array()
                        .into_iter()
                        .flatten()
                        .map(|cell| item_descriptor(cell, path))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(InfoItems::Grid(rows))
        }
        Value::Array(entries) => {
            let positional = entries
                .iter()
                .map(|entry| item_descriptor(entry, path))
                .collect::<Result<Vec<_>>>()?;
            Ok(InfoItems::Positional(positional))
        }
        other => bail!("'{path}.items' must be an object or an array, found {other}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::NodeRef;
    use crate::path::AttrPath;

    fn document() -> Value {
        json!({
            "traces": {
                "scatter": {
                    "attributes": {
                        "type": "scatter",
                        "x": {"valType": "data_array"},
                        "marker": {
                            "color": {"valType": "color", "arrayOk": true, "dflt": "#444"},
                            "symbol": {
                                "valType": "enumerated",
                                "values": ["circle", "/^square(-open)?$/", 0],
                                "dflt": "circle"
                            },
                            "editType": "style"
                        }
                    }
                }
            },
            "layout": {
                "layoutAttributes": {
                    "xaxis": {
                        "_isSubplotObj": true,
                        "range": {
                            "valType": "info_array",
                            "items": [{"valType": "any"}, {"valType": "any"}]
                        }
                    },
                    "annotations": {
                        "items": {
                            "annotation": {
                                "text": {"valType": "string", "dflt": ""},
                                "showarrow": {"valType": "boolean", "dflt": true}
                            }
                        },
                        "role": "object"
                    },
                    "shapes": {
                        "_isLinkedToArray": "shape",
                        "opacity": {"valType": "number", "min": 0, "max": 1, "dflt": 1}
                    }
                }
            }
        })
    }

    #[test]
    fn parses_trace_and_layout_attributes() {
        let schema = parse_schema(&document()).unwrap();
        let marker = AttrPath::parse("marker.symbol").unwrap();
        let symbol = schema
            .trace_node("scatter", marker.steps())
            .and_then(NodeRef::descriptor)
            .unwrap();
        assert_eq!(symbol.kind, ValueKind::Enumerated);
        assert!(matches!(symbol.values[1], EnumValue::Pattern(_)));
        assert!(matches!(symbol.values[2], EnumValue::Literal(_)));
    }

    #[test]
    fn recognises_both_container_array_forms() {
        let schema = parse_schema(&document()).unwrap();
        for (name, item) in [("annotations", "annotation"), ("shapes", "shape")] {
            match schema.layout.get(name) {
                Some(SchemaNode::Array(array)) => {
                    assert_eq!(array.item_name, item);
                    assert!(array.item.attrs.contains_key("templateitemname"));
                }
                other => panic!("{name} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn non_object_attributes_are_rejected() {
        let err = parse_schema(&json!({
            "layout": {"layoutAttributes": {"width": 3}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("layout.width"));
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let err = parse_schema(&json!({
            "layout": {"layoutAttributes": {"width": {"valType": "length"}}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown valType"));
    }

    #[test]
    fn info_arrays_require_items() {
        assert!(
            parse_schema(&json!({
                "layout": {"layoutAttributes": {"domain": {"valType": "info_array"}}}
            }))
            .is_err()
        );
    }
}
