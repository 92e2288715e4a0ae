use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::path::base_key;

use super::{TEMPLATE_ITEM_NAME, array_default_key, item_name};

/// Template of the sub-container `name`: `template[name]`, else the
/// template of its base key (`xaxis2` falls back to `xaxis`).
pub fn container_template<'t>(template: Option<&'t Value>, name: &str) -> Option<&'t Value> {
    let template = template?;
    let part = template.get(name).filter(|part| part.is_object());
    if part.is_some() {
        return part;
    }
    let base = base_key(name);
    if base.len() == name.len() {
        return None;
    }
    template.get(base).filter(|part| part.is_object())
}

/// Hands out trace templates, cycling through each type's list.
#[derive(Debug, Clone, Default)]
pub struct TraceTemplater<'t> {
    lists: HashMap<&'t str, &'t [Value]>,
    counts: HashMap<String, usize>,
}

impl<'t> TraceTemplater<'t> {
    /// `data` is the `data` part of a template document.
    pub fn new(data: Option<&'t Value>) -> Self {
        let lists = data
            .and_then(Value::as_object)
            .map(|types| {
                types
                    .iter()
                    .filter_map(|(trace_type, list)| match list {
                        Value::Array(list) if !list.is_empty() => {
                            Some((trace_type.as_str(), list.as_slice()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            lists,
            counts: HashMap::new(),
        }
    }

    /// Template of the next trace of `trace_type`, if the template has any.
    pub fn next(&mut self, trace_type: &str) -> Option<&'t Value> {
        let list: &'t [Value] = self.lists.get(trace_type).copied()?;
        let count = self.counts.entry(trace_type.to_string()).or_default();
        let template = &list[*count % list.len()];
        *count += 1;
        Some(template)
    }
}

/// Which template applies to one input item of a container array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemTemplate<'t> {
    /// The item names no template entry; the defaults entry applies.
    Defaults(Option<&'t Value>),
    /// The item names an existing entry; only that entry applies.
    Named(&'t Value),
    /// The item names an entry that does not exist. It gets no template
    /// and is hidden unless explicitly shown.
    Missing,
}

impl<'t> ItemTemplate<'t> {
    pub fn template(self) -> Option<&'t Value> {
        match self {
            ItemTemplate::Defaults(template) => template,
            ItemTemplate::Named(template) => Some(template),
            ItemTemplate::Missing => None,
        }
    }
}

/// Matches the items of one container array against its template part.
#[derive(Debug, Clone)]
pub struct ArrayTemplater<'t> {
    defaults: Option<&'t Value>,
    entries: &'t [Value],
    used: HashSet<&'t str>,
}

impl<'t> ArrayTemplater<'t> {
    /// `template` is the template of the container holding the array
    /// `name`.
    pub fn new(template: Option<&'t Value>, name: &str) -> Self {
        let defaults = template
            .and_then(|template| template.get(array_default_key(name)))
            .filter(|defaults| defaults.is_object());
        let entries = template
            .and_then(|template| template.get(name))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Self {
            defaults,
            entries,
            used: HashSet::new(),
        }
    }

    pub fn new_item(&mut self, item: &Value) -> ItemTemplate<'t> {
        let Some(wanted) = item_name(item.get(TEMPLATE_ITEM_NAME)) else {
            return ItemTemplate::Defaults(self.defaults);
        };
        let entries = self.entries;
        for entry in entries {
            if let Some(name) = item_name(entry.get("name"))
                && name == wanted
            {
                self.used.insert(name);
                return ItemTemplate::Named(entry);
            }
        }
        ItemTemplate::Missing
    }

    /// Named entries no input item referenced, each name once, in
    /// template order.
    pub fn default_items(&mut self) -> Vec<&'t Value> {
        let entries = self.entries;
        let mut out = Vec::new();
        for entry in entries {
            if let Some(name) = item_name(entry.get("name"))
                && self.used.insert(name)
            {
                out.push(entry);
            }
        }
        out
    }
}
