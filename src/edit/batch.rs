use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::containers::{ArrayIndex, ContainerRegistry};

/// Edits addressed to one item of a container array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemEdit {
    /// Whole-item directive: an object or the add marker inserts, `null` or
    /// the remove marker deletes.
    pub directive: Option<Value>,
    /// Property updates on the existing item, by attribute string relative
    /// to the item.
    pub props: IndexMap<String, Value>,
}

/// A keyed set of edits targeting one container array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditBatch {
    /// Whole-array directive: a replacement sequence or a removal.
    pub whole: Option<Value>,
    pub items: BTreeMap<usize, ItemEdit>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (sequence) or clear (`null`/remove marker) the whole array.
    #[must_use]
    pub fn whole(mut self, value: Value) -> Self {
        self.whole = Some(value);
        self
    }

    /// Insert `item` at `index`, shifting later items.
    #[must_use]
    pub fn insert(mut self, index: usize, item: Value) -> Self {
        self.items.entry(index).or_default().directive = Some(item);
        self
    }

    #[must_use]
    pub fn remove(mut self, index: usize) -> Self {
        self.items.entry(index).or_default().directive = Some(Value::Null);
        self
    }

    /// Set `property` of the item at `index`; `null` deletes it.
    #[must_use]
    pub fn update(mut self, index: usize, property: impl Into<String>, value: Value) -> Self {
        self.items
            .entry(index)
            .or_default()
            .props
            .insert(property.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.whole.is_none() && self.items.is_empty()
    }

    /// Parse the keyed map form: `""` addresses the whole array, other keys
    /// are item indices; inside an entry `""` carries the directive.
    ///
    /// ```text
    /// {"": {"": []}}            clear by replacement
    /// {"2": {"": "add"}}        insert an empty item at 2
    /// {"0": {"font.size": 12}}  update item 0
    /// ```
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = value
            .as_object()
            .context("edit batch must be an object keyed by item index")?;
        let mut batch = Self::new();
        for (key, entry) in entries {
            let entry = entry
                .as_object()
                .with_context(|| format!("edit batch entry '{key}' must be an object"))?;
            if key.is_empty() {
                batch.whole = entry.get("").cloned();
                continue;
            }
            let index: usize = match key.parse() {
                Ok(index) => index,
                Err(_) => bail!("edit batch key '{key}' is not an item index"),
            };
            batch.items.insert(index, item_edit(entry));
        }
        Ok(batch)
    }

    /// Sort flat attribute updates by the container array they touch.
    ///
    /// Returns one batch per array (in first-seen order) and the updates
    /// that address no container array.
    pub fn group(
        updates: &Map<String, Value>,
        registry: &ContainerRegistry,
    ) -> (IndexMap<String, EditBatch>, Map<String, Value>) {
        let mut batches: IndexMap<String, EditBatch> = IndexMap::new();
        let mut rest = Map::new();
        for (attr, value) in updates {
            let Some(found) = registry.locate(attr) else {
                rest.insert(attr.clone(), value.clone());
                continue;
            };
            let batch = batches.entry(found.array).or_default();
            match found.index {
                ArrayIndex::Whole => batch.whole = Some(value.clone()),
                ArrayIndex::Item(index) => {
                    let edit = batch.items.entry(index).or_default();
                    if found.property.is_empty() {
                        edit.directive = Some(value.clone());
                    } else {
                        edit.props.insert(found.property, value.clone());
                    }
                }
            }
        }
        (batches, rest)
    }
}

fn item_edit(entry: &Map<String, Value>) -> ItemEdit {
    let mut edit = ItemEdit::default();
    for (property, value) in entry {
        if property.is_empty() {
            edit.directive = Some(value.clone());
        } else {
            edit.props.insert(property.clone(), value.clone());
        }
    }
    edit
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_keyed_map_form() {
        let batch = EditBatch::from_value(&json!({
            "2": {"": "add"},
            "0": {"font.size": 12, "text": null},
        }))
        .unwrap();
        assert_eq!(batch.whole, None);
        assert_eq!(batch.items.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(batch.items[&2].directive, Some(json!("add")));
        assert_eq!(batch.items[&0].props["font.size"], json!(12));
        assert_eq!(batch.items[&0].props["text"], Value::Null);
    }

    #[test]
    fn whole_array_entry() {
        let batch = EditBatch::from_value(&json!({"": {"": null}})).unwrap();
        assert_eq!(batch.whole, Some(Value::Null));
    }

    #[test]
    fn rejects_non_index_keys() {
        assert!(EditBatch::from_value(&json!({"first": {"": "add"}})).is_err());
        assert!(EditBatch::from_value(&json!({"-1": {"": "add"}})).is_err());
        assert!(EditBatch::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn builders_match_parsed_form() {
        let built = EditBatch::new()
            .insert(1, json!({"text": "new"}))
            .remove(3)
            .update(0, "x", json!(1));
        let parsed = EditBatch::from_value(&json!({
            "1": {"": {"text": "new"}},
            "3": {"": null},
            "0": {"x": 1},
        }))
        .unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn groups_flat_updates_by_container() {
        let mut registry = ContainerRegistry::new();
        registry.register_root("annotations").register_root("shapes");
        let updates = json!({
            "annotations[2].text": "t",
            "annotations[0]": "remove",
            "shapes": [],
            "title.text": "plot",
        });
        let (batches, rest) = EditBatch::group(updates.as_object().unwrap(), &registry);

        let annotations = &batches["annotations"];
        assert_eq!(annotations.items[&2].props["text"], json!("t"));
        assert_eq!(annotations.items[&0].directive, Some(json!("remove")));
        assert_eq!(batches["shapes"].whole, Some(json!([])));
        assert_eq!(rest, *json!({"title.text": "plot"}).as_object().unwrap());
    }
}
