//! Reading and writing configuration trees through [`AttrPath`]s.
//!
//! Reads are total: anything structurally impossible reads as absent.
//! Writes are partial: they create missing intermediate containers, delete
//! (and prune) when the written value is deletable, and fail on scalars in
//! the way.

use serde_json::{Map, Value};

use super::{AttrPath, DeletePolicy, PathError, PathStep};

impl AttrPath {
    /// Read the value at this path. `null` reads as absent.
    ///
    /// A `[-1]` step fans the rest of the path out over every element; if
    /// all elements agree the shared value is returned, otherwise the
    /// per-element sequence (absent elements become `null`).
    pub fn get(&self, root: &Value) -> Option<Value> {
        get_steps(root, self.steps())
    }

    /// Borrow the value at a wildcard-free path.
    pub fn get_ref<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut current = root;
        for step in self.steps() {
            current = child(current, step)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Mutably borrow the value at a wildcard-free path.
    pub fn get_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        let mut current = root;
        for step in self.steps() {
            current = child_mut(current, step)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Write `value` at this path with the default deletion policy.
    pub fn set(&self, root: &mut Value, value: Option<Value>) -> Result<(), PathError> {
        self.set_with(root, value, &DeletePolicy::default())
    }

    pub fn set_with(
        &self,
        root: &mut Value,
        value: Option<Value>,
        policy: &DeletePolicy<'_>,
    ) -> Result<(), PathError> {
        self.set_relative(root, value, &AttrPath::root(), policy)
    }

    /// Write through this path where `root` itself lives at `base`.
    ///
    /// `base` only feeds the deletion policy, so an edit inside
    /// `annotations[2]` is judged by its full path.
    pub fn set_relative(
        &self,
        root: &mut Value,
        value: Option<Value>,
        base: &AttrPath,
        policy: &DeletePolicy<'_>,
    ) -> Result<(), PathError> {
        if !(root.is_object() || root.is_array()) {
            return Err(PathError::BadContainer {
                path: base.join(self.steps()).to_string(),
            });
        }
        if self.is_empty() {
            return Err(PathError::BadPropertyString(String::new()));
        }
        set_steps(root, self.steps(), base, value, policy)
    }
}

fn child<'v>(container: &'v Value, step: &PathStep) -> Option<&'v Value> {
    match (container, step) {
        (Value::Object(map), PathStep::Key(key)) => map.get(key),
        (Value::Array(items), PathStep::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn child_mut<'v>(container: &'v mut Value, step: &PathStep) -> Option<&'v mut Value> {
    match (container, step) {
        (Value::Object(map), PathStep::Key(key)) => map.get_mut(key),
        (Value::Array(items), PathStep::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn get_steps(container: &Value, steps: &[PathStep]) -> Option<Value> {
    let Some((last, head)) = steps.split_last() else {
        return (!container.is_null()).then(|| container.clone());
    };

    let mut current = container;
    for (position, step) in head.iter().enumerate() {
        if *step == PathStep::Wildcard {
            return get_all(current, &steps[position + 1..]);
        }
        current = child(current, step)?;
        if !is_container(current) {
            return None;
        }
    }

    if *last == PathStep::Wildcard || !is_container(current) {
        return None;
    }
    child(current, last)
        .filter(|value| !value.is_null())
        .cloned()
}

fn get_all(container: &Value, rest: &[PathStep]) -> Option<Value> {
    let Value::Array(items) = container else {
        return None;
    };
    let values: Vec<Option<Value>> = items.iter().map(|item| get_steps(item, rest)).collect();
    let first = values.first()?.clone();
    if values.iter().all(|value| *value == first) {
        return first;
    }
    Some(Value::Array(
        values
            .into_iter()
            .map(|value| value.unwrap_or(Value::Null))
            .collect(),
    ))
}

fn new_container(next: &PathStep) -> Value {
    if next.is_index() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Make sure `container[step]` exists.
///
/// Returns `false` when there is nothing there and nothing is needed
/// because the write is a deletion.
fn ensure_child(
    container: &mut Value,
    step: &PathStep,
    next: &PathStep,
    deleting: bool,
    path: &AttrPath,
) -> Result<bool, PathError> {
    let missing = match child(container, step) {
        Some(value) => value.is_null(),
        None => true,
    };
    if !missing {
        return Ok(true);
    }
    if deleting {
        return Ok(false);
    }
    match (container, step) {
        (Value::Object(map), PathStep::Key(key)) => {
            map.insert(key.clone(), new_container(next));
        }
        (Value::Array(items), PathStep::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            items[*index] = new_container(next);
        }
        (Value::Array(_), _) => {
            return Err(PathError::NotAnObject {
                path: path.to_string(),
            });
        }
        _ => {
            return Err(PathError::NotAnArray {
                path: path.to_string(),
            });
        }
    }
    Ok(true)
}

fn set_steps(
    root: &mut Value,
    steps: &[PathStep],
    base: &AttrPath,
    mut value: Option<Value>,
    policy: &DeletePolicy<'_>,
) -> Result<(), PathError> {
    let full = base.join(steps);
    let mut deleting = policy.is_deletable(value.as_ref(), &full);
    let last = steps.len() - 1;
    // number of steps walked into; containers at depths 0..=walked were touched
    let mut walked = 0;

    {
        let mut current = &mut *root;
        let mut reached_end = true;
        for position in 0..last {
            let step = &steps[position];
            if step.is_index() && !current.is_array() {
                return Err(PathError::NotAnArray {
                    path: full.to_string(),
                });
            }

            if *step == PathStep::Wildcard {
                let prefix = base.join(&steps[..position]);
                let inner = &steps[position + 1..];
                let all_set = set_all(current, inner, &prefix, value.take(), policy)?;
                if all_set {
                    return Ok(());
                }
                deleting = true;
                reached_end = false;
                break;
            }

            if !ensure_child(current, step, &steps[position + 1], deleting, &full)? {
                reached_end = false;
                break;
            }
            current = match child_mut(current, step) {
                Some(next) => next,
                None => {
                    return Err(PathError::NotAnObject {
                        path: full.to_string(),
                    });
                }
            };
            if !is_container(current) {
                return Err(PathError::NotAnObject {
                    path: full.to_string(),
                });
            }
            walked += 1;
        }

        if reached_end {
            write_final(current, &steps[last], value, deleting, &full)?;
            if !deleting {
                return Ok(());
            }
        }
    }

    prune(root, &steps[..walked], base, policy);
    Ok(())
}

fn write_final(
    container: &mut Value,
    step: &PathStep,
    value: Option<Value>,
    deleting: bool,
    full: &AttrPath,
) -> Result<(), PathError> {
    match (container, step) {
        (Value::Object(map), PathStep::Key(key)) => {
            if deleting {
                map.shift_remove(key);
            } else if let Some(value) = value {
                map.insert(key.clone(), value);
            }
        }
        (Value::Array(items), PathStep::Index(index)) => {
            if deleting {
                if *index + 1 == items.len() {
                    items.pop();
                    // earlier unsets may have left holes at the end
                    while items.last().is_some_and(Value::is_null) {
                        items.pop();
                    }
                } else if *index < items.len() {
                    items[*index] = Value::Null;
                }
            } else if let Some(value) = value {
                if items.len() <= *index {
                    items.resize(*index + 1, Value::Null);
                }
                items[*index] = value;
            }
        }
        (Value::Object(_), _) => {
            return Err(PathError::NotAnArray {
                path: full.to_string(),
            });
        }
        _ => {
            return Err(PathError::NotAnObject {
                path: full.to_string(),
            });
        }
    }
    Ok(())
}

/// Apply the rest of a path to every element of `container`.
///
/// A sequence `value` is spread over the elements (cycling when shorter);
/// anything else is replicated. Returns whether every element was assigned
/// rather than deleted.
fn set_all(
    container: &mut Value,
    inner: &[PathStep],
    prefix: &AttrPath,
    value: Option<Value>,
    policy: &DeletePolicy<'_>,
) -> Result<bool, PathError> {
    let Value::Array(items) = container else {
        return Err(PathError::NotAnArray {
            path: prefix.to_string(),
        });
    };
    let spread = match &value {
        Some(Value::Array(values)) => Some(values.clone()),
        _ => None,
    };
    let mut all_set = true;

    for (position, item) in items.iter_mut().enumerate() {
        let item_path = prefix.index(position);
        let this_value = match &spread {
            Some(values) if values.is_empty() => None,
            Some(values) => Some(values[position % values.len()].clone()),
            None => value.clone(),
        };
        let deleting = policy.is_deletable(this_value.as_ref(), &item_path.join(inner));
        if deleting {
            all_set = false;
        }
        if item.is_null() {
            if deleting {
                continue;
            }
            *item = new_container(&inner[0]);
        }
        if !is_container(item) {
            return Err(PathError::NotAnObject {
                path: item_path.to_string(),
            });
        }
        set_steps(item, inner, &item_path, this_value, policy)?;
    }
    Ok(all_set)
}

/// Walk back up the touched containers, innermost first, dropping entries
/// that are now deletable. Stops at the first container that keeps an entry.
fn prune(root: &mut Value, chain: &[PathStep], base: &AttrPath, policy: &DeletePolicy<'_>) {
    let mut emptied: Option<&PathStep> = None;
    for depth in (0..=chain.len()).rev() {
        let location = AttrPath::from_steps(chain[..depth].to_vec());
        let Some(container) = location.get_mut(root) else {
            return;
        };
        let container_path = base.join(location.steps());
        if prune_container(container, &container_path, emptied, policy) {
            return;
        }
        emptied = depth.checked_sub(1).map(|parent| &chain[parent]);
    }
}

/// Returns whether any entry survived.
fn prune_container(
    container: &mut Value,
    path: &AttrPath,
    emptied: Option<&PathStep>,
    policy: &DeletePolicy<'_>,
) -> bool {
    let is_emptied_child = |step: &PathStep, value: &Value| {
        emptied == Some(step)
            && match value {
                Value::Object(map) => map.is_empty(),
                Value::Array(items) => items.is_empty(),
                _ => false,
            }
    };

    match container {
        Value::Array(items) => {
            while let Some(last) = items.last() {
                let step = PathStep::Index(items.len() - 1);
                let deletable = is_emptied_child(&step, last)
                    || policy.is_deletable(Some(last), &path.join(std::slice::from_ref(&step)));
                if !deletable {
                    return true;
                }
                items.pop();
            }
            false
        }
        Value::Object(map) => {
            let doomed: Vec<String> = map
                .iter()
                .filter(|&(key, value)| {
                    let step = PathStep::Key(key.clone());
                    is_emptied_child(&step, value)
                        || policy.is_deletable(Some(value), &path.key(key.as_str()))
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in doomed {
                map.shift_remove(&key);
            }
            !map.is_empty()
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> AttrPath {
        AttrPath::parse(raw).unwrap()
    }

    #[test]
    fn get_walks_maps_and_sequences() {
        let tree = json!({"a": {"b": [1, {"c": "deep"}]}});
        assert_eq!(path("a.b[1].c").get(&tree), Some(json!("deep")));
        assert_eq!(path("a.b[0]").get(&tree), Some(json!(1)));
    }

    #[test]
    fn get_is_total_on_structural_mismatch() {
        let tree = json!({"a": {"b": 5}, "n": null});
        assert_eq!(path("a[0].c").get(&tree), None);
        assert_eq!(path("a.b.c").get(&tree), None);
        assert_eq!(path("n").get(&tree), None);
        assert_eq!(path("missing.x").get(&tree), None);
        assert_eq!(path("x").get(&json!(3)), None);
    }

    #[test]
    fn wildcard_get_collapses_identical_results() {
        let tree = json!({"arr": [{"x": 1}, {"x": 1}]});
        assert_eq!(path("arr[-1].x").get(&tree), Some(json!(1)));

        let mixed = json!({"arr": [{"x": 1}, {"x": 2}, {}]});
        assert_eq!(path("arr[-1].x").get(&mixed), Some(json!([1, 2, null])));
    }

    #[test]
    fn set_creates_intermediate_containers() {
        let mut tree = json!({});
        path("a[1].b.c").set(&mut tree, Some(json!(7))).unwrap();
        assert_eq!(tree, json!({"a": [null, {"b": {"c": 7}}]}));
    }

    #[test]
    fn set_fails_through_scalars() {
        let mut tree = json!({"a": 5, "s": {"k": 1}});
        assert!(matches!(
            path("a.b").set(&mut tree, Some(json!(1))),
            Err(PathError::NotAnObject { .. })
        ));
        assert!(matches!(
            path("s[0]").set(&mut tree, Some(json!(1))),
            Err(PathError::NotAnArray { .. })
        ));
        assert!(matches!(
            path("x").set(&mut json!("scalar"), Some(json!(1))),
            Err(PathError::BadContainer { .. })
        ));
    }

    #[test]
    fn deleting_prunes_emptied_ancestors() {
        let mut tree = json!({});
        path("a[0].b").set(&mut tree, Some(json!("v"))).unwrap();
        assert_eq!(path("a[0].b").get(&tree), Some(json!("v")));

        path("a[0].b").set(&mut tree, Some(json!({}))).unwrap();
        assert_eq!(tree, json!({}));
        assert_eq!(path("a").get(&tree), None);
    }

    #[test]
    fn pruning_stops_at_first_surviving_entry() {
        let mut tree = json!({"font": {"size": 12, "color": "red"}, "keep": 1});
        path("font.size").set(&mut tree, None).unwrap();
        assert_eq!(tree, json!({"font": {"color": "red"}, "keep": 1}));
    }

    #[test]
    fn deleting_last_element_drops_trailing_holes() {
        let mut tree = json!({"v": [1, null, null, 4]});
        path("v[3]").set(&mut tree, None).unwrap();
        assert_eq!(tree, json!({"v": [1]}));
    }

    #[test]
    fn deleting_missing_value_is_a_noop() {
        let mut tree = json!({"a": {"b": 1}});
        path("x.y.z").set(&mut tree, None).unwrap();
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn empty_map_as_sequence_element_is_assigned() {
        let mut tree = json!({"items": [{"a": 1}]});
        path("items[1]").set(&mut tree, Some(json!({}))).unwrap();
        assert_eq!(tree, json!({"items": [{"a": 1}, {}]}));
    }

    #[test]
    fn wildcard_set_fans_out() {
        let mut tree = json!({"arr": [{"x": 1}, {"x": 2}, {}]});
        path("arr[-1].x").set(&mut tree, Some(json!(5))).unwrap();
        assert_eq!(tree, json!({"arr": [{"x": 5}, {"x": 5}, {"x": 5}]}));
        assert_eq!(path("arr[-1].x").get(&tree), Some(json!(5)));
    }

    #[test]
    fn wildcard_set_cycles_sequence_values() {
        let mut tree = json!({"arr": [{}, {}, {}]});
        path("arr[-1].x").set(&mut tree, Some(json!(["a", "b"]))).unwrap();
        assert_eq!(tree, json!({"arr": [{"x": "a"}, {"x": "b"}, {"x": "a"}]}));
    }

    #[test]
    fn wildcard_delete_keeps_placeholder_items() {
        let mut tree = json!({"arr": [{"x": 1, "y": 0}, {"x": 2}]});
        path("arr[-1].x").set(&mut tree, None).unwrap();
        assert_eq!(tree, json!({"arr": [{"y": 0}, {}]}));
    }

    #[test]
    fn null_inside_args_is_stored() {
        let mut tree = json!({"buttons": [{"args": ["a", 1]}]});
        path("buttons[0].args[1]").set(&mut tree, Some(Value::Null)).unwrap();
        assert_eq!(tree, json!({"buttons": [{"args": ["a", null]}]}));
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut tree = json!({"a": {"b": [1, 2]}});
        if let Some(Value::Array(items)) = path("a.b").get_mut(&mut tree) {
            items.push(json!(3));
        }
        assert_eq!(tree, json!({"a": {"b": [1, 2, 3]}}));
    }
}
