use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{AttrGroup, Schema, SchemaNode};
use crate::options::EngineOptions;
use crate::path::base_key;
use crate::resolve::resolve_with_template;

use super::{
    ArrayTemplater, ItemTemplate, TEMPLATE_ITEM_NAME, TraceTemplater, container_template,
};

/// A part of a template that does not line up with the figure it is
/// applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TemplateIssue {
    /// The template has no `layout` object.
    NoLayout,
    /// The template has no `data` object.
    NoData,
    /// A layout container in the template matches nothing in the figure.
    UnusedLayout { path: String },
    /// A trace type the schema does not know.
    UnknownTraceType { trace_type: String },
    /// A trace whose type has no template entries.
    MissingTrace { index: usize, trace_type: String },
    /// More template entries than traces of that type.
    UnusedTraces {
        trace_type: String,
        template_count: usize,
        data_count: usize,
    },
    /// Fewer template entries than traces, so entries are reused.
    ReusedTraces {
        trace_type: String,
        template_count: usize,
        data_count: usize,
    },
    /// A container item naming a template entry that does not exist.
    MissingItem { path: String, name: String },
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateIssue::NoLayout => write!(f, "the template has no key layout"),
            TemplateIssue::NoData => write!(f, "the template has no key data"),
            TemplateIssue::UnusedLayout { path } => {
                write!(f, "{path} is not used because the figure has no matching container")
            }
            TemplateIssue::UnknownTraceType { trace_type } => {
                write!(f, "the template has traces of unknown type '{trace_type}'")
            }
            TemplateIssue::MissingTrace { index, trace_type } => write!(
                f,
                "there are no templates for trace {index}, of type {trace_type}"
            ),
            TemplateIssue::UnusedTraces {
                trace_type,
                template_count,
                data_count,
            } => write!(
                f,
                "some of the templates of type {trace_type} were not used: \
                 {template_count} templates, {data_count} traces"
            ),
            TemplateIssue::ReusedTraces {
                trace_type,
                template_count,
                data_count,
            } => write!(
                f,
                "some of the templates of type {trace_type} were used more than once: \
                 {template_count} templates, {data_count} traces"
            ),
            TemplateIssue::MissingItem { path, name } => {
                write!(f, "there are no templates for item {path} with name {name}")
            }
        }
    }
}

/// Check `template` (or the figure's own `layout.template`) against
/// `figure`, logging and returning every mismatch.
pub fn validate_template(
    figure: &Value,
    template: Option<&Value>,
    schema: &Schema,
    options: &EngineOptions,
) -> Vec<TemplateIssue> {
    let empty = Value::Object(Map::new());
    let template = template
        .filter(|template| template.is_object())
        .or_else(|| figure.get("layout").and_then(|layout| layout.get("template")))
        .filter(|template| template.is_object())
        .unwrap_or(&empty);

    let mut issues = Vec::new();
    let resolved = resolve_with_template(figure, Some(template), schema, options);

    match template.get("layout") {
        Some(Value::Object(layout_template)) => {
            let mut paths = HashSet::new();
            if let Some(Value::Object(layout)) = resolved.get("layout") {
                collect_layout_paths(layout, &["layout".to_string()], &mut paths);
            }
            unused_layout(layout_template, "layout", &paths, &mut issues);
        }
        _ => issues.push(TemplateIssue::NoLayout),
    }

    match template.get("data") {
        Some(Value::Object(data_template)) => {
            trace_counts(&resolved, template, data_template, schema, &mut issues);
        }
        _ => issues.push(TemplateIssue::NoData),
    }

    missing_items(figure, template, schema, &mut issues);

    for issue in &issues {
        tracing::warn!(%issue, "template mismatch");
    }
    issues
}

fn collect_layout_paths(
    layout: &Map<String, Value>,
    prefixes: &[String],
    paths: &mut HashSet<String>,
) {
    for (key, value) in layout {
        let Value::Object(child) = value else {
            continue;
        };
        if key.starts_with('_') {
            continue;
        }
        let base = base_key(key);
        let mut next = Vec::new();
        for prefix in prefixes {
            next.push(format!("{prefix}.{key}"));
            if base != key {
                next.push(format!("{prefix}.{base}"));
            }
        }
        paths.extend(next.iter().cloned());
        collect_layout_paths(child, &next, paths);
    }
}

fn unused_layout(
    template: &Map<String, Value>,
    path: &str,
    paths: &HashSet<String>,
    issues: &mut Vec<TemplateIssue>,
) {
    for (key, value) in template {
        let Value::Object(child) = value else {
            continue;
        };
        if key.contains("defaults") {
            continue;
        }
        let next = format!("{path}.{key}");
        if paths.contains(&next) {
            unused_layout(child, &next, paths, issues);
        } else {
            issues.push(TemplateIssue::UnusedLayout { path: next });
        }
    }
}

fn trace_counts(
    resolved: &Value,
    template: &Value,
    data_template: &Map<String, Value>,
    schema: &Schema,
    issues: &mut Vec<TemplateIssue>,
) {
    let mut templater = TraceTemplater::new(template.get("data"));
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let traces = resolved.get("data").and_then(Value::as_array);
    for (index, trace) in traces.into_iter().flatten().enumerate() {
        let Some(trace_type) = trace.get("type").and_then(Value::as_str) else {
            continue;
        };
        *counts.entry(trace_type).or_default() += 1;
        if templater.next(trace_type).is_none() {
            issues.push(TemplateIssue::MissingTrace {
                index,
                trace_type: trace_type.to_string(),
            });
        }
    }

    for (trace_type, list) in data_template {
        if schema.trace(trace_type).is_none() {
            issues.push(TemplateIssue::UnknownTraceType {
                trace_type: trace_type.clone(),
            });
        }
        let template_count = list.as_array().map_or(0, Vec::len);
        let data_count = counts.get(trace_type.as_str()).copied().unwrap_or(0);
        if template_count > data_count {
            issues.push(TemplateIssue::UnusedTraces {
                trace_type: trace_type.clone(),
                template_count,
                data_count,
            });
        } else if data_count > template_count {
            issues.push(TemplateIssue::ReusedTraces {
                trace_type: trace_type.clone(),
                template_count,
                data_count,
            });
        }
    }
}

fn missing_items(
    figure: &Value,
    template: &Value,
    schema: &Schema,
    issues: &mut Vec<TemplateIssue>,
) {
    let mut templater = TraceTemplater::new(template.get("data"));
    if let Some(Value::Array(traces)) = figure.get("data") {
        for (index, trace) in traces.iter().enumerate() {
            let Value::Object(input) = trace else {
                continue;
            };
            let Some(trace_type) = schema.resolve_trace_type(input.get("type")) else {
                continue;
            };
            let Some(attrs) = schema.trace(trace_type) else {
                continue;
            };
            let trace_template = templater.next(trace_type);
            crawl_items(input, attrs, trace_template, &format!("data[{index}]"), issues);
        }
    }
    if let Some(Value::Object(layout)) = figure.get("layout") {
        let layout_template = template.get("layout").filter(|layout| layout.is_object());
        crawl_items(layout, &schema.layout, layout_template, "layout", issues);
    }
}

fn crawl_items(
    input: &Map<String, Value>,
    group: &AttrGroup,
    template: Option<&Value>,
    path: &str,
    issues: &mut Vec<TemplateIssue>,
) {
    for (key, value) in input {
        match (group.get(key), value) {
            (Some(SchemaNode::Group(child)), Value::Object(child_input)) => {
                let child_path = format!("{path}.{key}");
                let child_template = container_template(template, key);
                crawl_items(child_input, child, child_template, &child_path, issues);
            }
            (Some(SchemaNode::Array(array)), Value::Array(items)) => {
                let mut templater = ArrayTemplater::new(template, key);
                for (index, item) in items.iter().enumerate() {
                    let Value::Object(item_input) = item else {
                        continue;
                    };
                    let item_path = format!("{path}.{key}[{index}]");
                    match templater.new_item(item) {
                        ItemTemplate::Missing => issues.push(TemplateIssue::MissingItem {
                            path: item_path,
                            name: item_input
                                .get(TEMPLATE_ITEM_NAME)
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        }),
                        selected => crawl_items(
                            item_input,
                            &array.item,
                            selected.template(),
                            &item_path,
                            issues,
                        ),
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{ArraySchema, Descriptor, ValueKind};

    fn schema() -> Schema {
        let axis = AttrGroup::new()
            .subplot()
            .with_value("color", Descriptor::new(ValueKind::Color));
        let annotation = AttrGroup::new()
            .with_value("name", Descriptor::new(ValueKind::String))
            .with_value("templateitemname", Descriptor::new(ValueKind::String))
            .with_value("text", Descriptor::new(ValueKind::String));
        let layout = AttrGroup::new()
            .with_attr("xaxis", SchemaNode::Group(axis))
            .with_attr(
                "annotations",
                SchemaNode::Array(ArraySchema {
                    item_name: "annotation".into(),
                    item: annotation,
                }),
            );
        Schema::new(layout)
            .with_trace("scatter", AttrGroup::new())
            .with_trace("bar", AttrGroup::new())
    }

    #[test]
    fn matching_template_has_no_issues() {
        let figure = json!({
            "data": [{"type": "bar"}],
            "layout": {"xaxis2": {}},
        });
        let template = json!({
            "data": {"bar": [{}]},
            "layout": {"xaxis": {"color": "#333"}},
        });
        let issues =
            validate_template(&figure, Some(&template), &schema(), &EngineOptions::default());
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn reports_every_mismatch() {
        let figure = json!({
            "data": [{"type": "bar"}, {"type": "bar"}, {"type": "scatter"}],
            "layout": {
                "annotations": [{"templateitemname": "logo"}, {"templateitemname": "gone"}],
                "template": {
                    "data": {"bar": [{}], "pie": [{}]},
                    "layout": {
                        "polar": {"bgcolor": "#fff"},
                        "annotationdefaults": {"text": "x"},
                        "annotations": [{"name": "logo"}],
                    },
                },
            },
        });
        let issues = validate_template(&figure, None, &schema(), &EngineOptions::default());
        assert_eq!(
            issues,
            vec![
                TemplateIssue::UnusedLayout {
                    path: "layout.polar".into()
                },
                TemplateIssue::MissingTrace {
                    index: 2,
                    trace_type: "scatter".into()
                },
                TemplateIssue::ReusedTraces {
                    trace_type: "bar".into(),
                    template_count: 1,
                    data_count: 2
                },
                TemplateIssue::UnknownTraceType {
                    trace_type: "pie".into()
                },
                TemplateIssue::UnusedTraces {
                    trace_type: "pie".into(),
                    template_count: 1,
                    data_count: 0
                },
                TemplateIssue::MissingItem {
                    path: "layout.annotations[1]".into(),
                    name: "gone".into()
                },
            ]
        );
    }

    #[test]
    fn missing_parts_are_reported() {
        let options = EngineOptions::default();
        let issues = validate_template(&json!({}), Some(&json!({})), &schema(), &options);
        assert_eq!(issues, vec![TemplateIssue::NoLayout, TemplateIssue::NoData]);
    }

    #[test]
    fn issues_serialize_with_a_code() {
        let issue = TemplateIssue::MissingTrace {
            index: 0,
            trace_type: "bar".into(),
        };
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"code": "missingTrace", "index": 0, "traceType": "bar"})
        );
        assert_eq!(issue.to_string(), "there are no templates for trace 0, of type bar");
    }
}
