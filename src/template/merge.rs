use serde_json::{Map, Value};

use crate::path::base_key;

use super::{ArrayTemplater, TEMPLATE_ITEM_NAME};

/// Merge the template part `old` into `new` in place.
///
/// Maps merge key by key with `new` winning; keys only in `old` are
/// copied. Container arrays match new items to old named entries by
/// `templateitemname` (unnamed items take the old defaults entry) and then
/// receive the old named entries nothing referenced. An old base key
/// (`xaxis`) is also merged into numbered keys of `new` (`xaxis2`) that
/// `old` does not have itself.
pub fn merge_templates(old: &Value, new: &mut Value) {
    let (Value::Object(old_map), Value::Object(new_map)) = (old, new) else {
        return;
    };
    let mut old_keys: Vec<&String> = old_map.keys().collect();
    old_keys.sort();

    for key in old_keys {
        let old_value = &old_map[key];
        match new_map.get_mut(key) {
            Some(new_value) => merge_one(old, old_value, new_value, key),
            None => {
                new_map.insert(key.clone(), old_value.clone());
            }
        }

        if base_key(key) != key {
            continue;
        }
        let numbered: Vec<String> = new_map
            .keys()
            .filter(|other| {
                other.as_str() != key.as_str()
                    && base_key(other) == key.as_str()
                    && !old_map.contains_key(other.as_str())
            })
            .cloned()
            .collect();
        for other in numbered {
            if let Some(new_value) = new_map.get_mut(&other) {
                merge_one(old, old_value, new_value, key);
            }
        }
    }
}

fn merge_one(old_container: &Value, old_value: &Value, new_value: &mut Value, key: &str) {
    match (old_value, new_value) {
        (Value::Object(_), new_value @ Value::Object(_)) => merge_templates(old_value, new_value),
        (Value::Array(_), Value::Array(items)) => {
            let mut templater = ArrayTemplater::new(Some(old_container), key);
            for item in items.iter_mut() {
                if let Some(old_item) = templater.new_item(item).template() {
                    merge_templates(old_item, item);
                }
            }
            items.extend(templater.default_items().into_iter().cloned());
            for item in items.iter_mut() {
                if let Value::Object(item) = item {
                    item.shift_remove(TEMPLATE_ITEM_NAME);
                }
            }
        }
        _ => {}
    }
}

/// Compose a previous template document into a freshly extracted one.
///
/// Layouts merge with [`merge_templates`]. Per trace type, new entry `i`
/// merges with old entry `i % old_len`, surplus old entries are appended
/// and types only the old template has are copied.
pub fn compose_templates(old: &Value, new: &mut Value) {
    let Value::Object(new_doc) = new else {
        return;
    };

    if let Some(old_layout) = old.get("layout").filter(|layout| layout.is_object()) {
        match new_doc.get_mut("layout") {
            Some(new_layout @ Value::Object(_)) => merge_templates(old_layout, new_layout),
            _ => {
                new_doc.insert("layout".to_string(), old_layout.clone());
            }
        }
    }

    let Some(old_data) = old.get("data").and_then(Value::as_object) else {
        return;
    };
    let data = new_doc
        .entry("data")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(data) = data else {
        return;
    };
    for (trace_type, old_list) in old_data {
        let Value::Array(old_list) = old_list else {
            continue;
        };
        match data.get_mut(trace_type) {
            Some(Value::Array(_)) if old_list.is_empty() => {}
            Some(Value::Array(list)) => {
                let new_len = list.len();
                for (position, entry) in list.iter_mut().enumerate() {
                    merge_templates(&old_list[position % old_list.len()], entry);
                }
                list.extend(old_list.iter().skip(new_len).cloned());
            }
            _ => {
                data.insert(trace_type.clone(), Value::Array(old_list.clone()));
            }
        }
    }
}
