use std::collections::{BTreeSet, HashMap};
use std::mem;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::options::EngineOptions;
use crate::path::{AttrPath, DeletePolicy, PathError};

use super::batch::EditBatch;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("'{array}' holds a {found} where a container array was expected")]
    NotAnArray { array: String, found: &'static str },
}

/// Redraw routines of one kind of container array.
pub trait ArrayRedraw {
    /// Re-derive the resolved items after the input items changed.
    fn supply_defaults(&mut self, root: &Value);

    /// Redraw the whole component.
    fn draw(&mut self, array: &str);

    /// Whether [`ArrayRedraw::draw_one`] is implemented.
    fn draws_items(&self) -> bool {
        false
    }

    fn draw_one(&mut self, _array: &str, _index: usize) {}
}

/// Redraw hooks keyed by container array.
///
/// Lookups try the full array string (`scene2.annotations`) and then its
/// last key (`annotations`).
#[derive(Default)]
pub struct RedrawRegistry {
    hooks: HashMap<String, Box<dyn ArrayRedraw>>,
}

impl std::fmt::Debug for RedrawRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrawRegistry")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RedrawRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, array: impl Into<String>, hook: Box<dyn ArrayRedraw>) -> &mut Self {
        self.hooks.insert(array.into(), hook);
        self
    }

    pub fn contains(&self, array: &str) -> bool {
        self.key_for(array).is_some()
    }

    fn key_for(&self, array: &str) -> Option<String> {
        if self.hooks.contains_key(array) {
            return Some(array.to_string());
        }
        let last = array.rsplit('.').next()?;
        self.hooks.contains_key(last).then(|| last.to_string())
    }

    fn get_mut(&mut self, array: &str) -> Option<&mut Box<dyn ArrayRedraw>> {
        let key = self.key_for(array)?;
        self.hooks.get_mut(&key)
    }
}

/// Signals from the caller that a heavier recompute is already pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditFlags {
    pub replot: bool,
    pub recalc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReport {
    /// `false` when the caller must re-derive and redraw everything.
    pub applied_in_place: bool,
    /// Item positions whose rendering is stale.
    pub redraw_indices: Vec<usize>,
}

/// Bookkeeping of the ascending pass.
#[derive(Debug, Default)]
struct ItemPass {
    /// Indices queued for the descending pass.
    deletes: Vec<usize>,
    /// Lowest index of an insertion or deletion.
    first_change: Option<usize>,
    processed: BTreeSet<usize>,
}

/// Applies [`EditBatch`]es to container arrays of a configuration tree.
pub struct ArrayEditor<'a> {
    options: &'a EngineOptions,
    policy: DeletePolicy<'a>,
    hooks: &'a mut RedrawRegistry,
}

impl<'a> ArrayEditor<'a> {
    pub fn new(
        options: &'a EngineOptions,
        policy: DeletePolicy<'a>,
        hooks: &'a mut RedrawRegistry,
    ) -> Self {
        Self {
            options,
            policy,
            hooks,
        }
    }

    /// Apply `batch` to the array at attribute string `array` of `root`.
    ///
    /// Inserts and updates run in ascending index order, so later indices
    /// of the batch already see earlier insertions; deletions run last, in
    /// descending order. Out-of-range and contradictory entries are logged
    /// and skipped.
    pub fn apply(
        &mut self,
        root: &mut Value,
        array: &str,
        batch: &EditBatch,
        flags: EditFlags,
    ) -> Result<EditReport, EditError> {
        let path = AttrPath::parse(array)?;

        if let Some(whole) = &batch.whole {
            return self.apply_whole(root, array, &path, whole, !batch.items.is_empty(), flags);
        }

        let mut items = match path.get_mut(root) {
            Some(Value::Array(items)) => mem::take(items),
            Some(other) => {
                return Err(EditError::NotAnArray {
                    array: array.to_string(),
                    found: kind_name(other),
                });
            }
            None => Vec::new(),
        };
        let old_len = items.len();
        let snapshot = items.clone();
        let mut pass = ItemPass::default();
        if let Err(err) = self.apply_items(array, &path, &mut items, batch, &mut pass) {
            if let Some(slot) = path.get_mut(root) {
                *slot = Value::Array(snapshot);
            }
            return Err(err);
        }

        let ItemPass {
            mut deletes,
            first_change,
            processed,
        } = pass;
        deletes.sort_unstable_by(|a, b| b.cmp(a));
        deletes.dedup();
        for index in deletes {
            if index < items.len() {
                items.remove(index);
            }
        }

        let new_len = items.len();
        let restored = if items.is_empty() {
            None
        } else {
            Some(Value::Array(items))
        };
        path.set_with(root, restored, &self.policy)?;

        let redraw_indices: Vec<usize> = match first_change {
            Some(first) => processed
                .iter()
                .copied()
                .filter(|index| *index < first)
                .chain(first..old_len.max(new_len))
                .collect(),
            None => processed.into_iter().collect(),
        };
        let applied_in_place = self.redraw(root, array, &redraw_indices, flags);
        Ok(EditReport {
            applied_in_place,
            redraw_indices,
        })
    }

    fn apply_items(
        &self,
        array: &str,
        path: &AttrPath,
        items: &mut Vec<Value>,
        batch: &EditBatch,
        pass: &mut ItemPass,
    ) -> Result<(), EditError> {
        for (&index, edit) in &batch.items {
            let adding = edit
                .directive
                .as_ref()
                .is_some_and(|directive| self.options.is_add(directive) || directive.is_object());
            let in_range = if adding {
                index <= items.len()
            } else {
                index < items.len()
            };
            if !in_range {
                tracing::warn!(
                    container = %array,
                    index,
                    "index out of range of container array; skipping edit"
                );
                continue;
            }

            if let Some(directive) = &edit.directive {
                if !edit.props.is_empty() {
                    tracing::warn!(
                        container = %array,
                        index,
                        "insertion and removal are incompatible with edits to the same index"
                    );
                }
                if self.options.is_remove(directive) {
                    pass.deletes.push(index);
                } else if self.options.is_add(directive) {
                    items.insert(index, Value::Object(Map::new()));
                } else if directive.is_object() {
                    items.insert(index, directive.clone());
                } else {
                    tracing::warn!(
                        container = %array,
                        index,
                        value = %directive,
                        "unrecognized full object edit value"
                    );
                    continue;
                }
                pass.first_change.get_or_insert(index);
            } else {
                let item = &mut items[index];
                if item.is_null() {
                    *item = Value::Object(Map::new());
                }
                let base = path.index(index);
                for (property, value) in &edit.props {
                    AttrPath::parse(property)?.set_relative(
                        item,
                        Some(value.clone()),
                        &base,
                        &self.policy,
                    )?;
                }
            }
            pass.processed.insert(index);
        }
        Ok(())
    }

    fn apply_whole(
        &mut self,
        root: &mut Value,
        array: &str,
        path: &AttrPath,
        whole: &Value,
        mixed: bool,
        flags: EditFlags,
    ) -> Result<EditReport, EditError> {
        if mixed {
            tracing::warn!(container = %array, "full array edits are incompatible with other edits");
        }
        let old_len = match path.get_ref(root) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };

        if self.options.is_remove(whole) {
            path.set_with(root, None, &self.policy)?;
        } else if let Value::Array(replacement) = whole {
            let value = (!replacement.is_empty()).then(|| whole.clone());
            path.set_with(root, value, &self.policy)?;
        } else {
            tracing::warn!(container = %array, value = %whole, "unrecognized full array edit value");
            return Ok(EditReport {
                applied_in_place: true,
                redraw_indices: Vec::new(),
            });
        }

        let new_len = match path.get_ref(root) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };
        let redraw_indices: Vec<usize> = (0..old_len.max(new_len)).collect();
        let applied_in_place = self.redraw(root, array, &[], flags);
        Ok(EditReport {
            applied_in_place,
            redraw_indices,
        })
    }

    /// Run the registered hooks; `false` means the caller has to do a full
    /// redraw itself.
    fn redraw(&mut self, root: &Value, array: &str, indices: &[usize], flags: EditFlags) -> bool {
        if flags.replot || flags.recalc {
            return false;
        }
        let Some(hook) = self.hooks.get_mut(array) else {
            tracing::debug!(container = %array, "no redraw routine registered");
            return false;
        };
        hook.supply_defaults(root);
        if hook.draws_items() && !indices.is_empty() {
            for index in indices {
                hook.draw_one(array, *index);
            }
        } else {
            hook.draw(array);
        }
        true
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Calls {
        defaults: usize,
        draws: usize,
        drawn: Vec<usize>,
    }

    struct Recorder {
        calls: Rc<RefCell<Calls>>,
        per_item: bool,
    }

    impl ArrayRedraw for Recorder {
        fn supply_defaults(&mut self, _root: &Value) {
            self.calls.borrow_mut().defaults += 1;
        }

        fn draw(&mut self, _array: &str) {
            self.calls.borrow_mut().draws += 1;
        }

        fn draws_items(&self) -> bool {
            self.per_item
        }

        fn draw_one(&mut self, _array: &str, index: usize) {
            self.calls.borrow_mut().drawn.push(index);
        }
    }

    fn registry(per_item: bool) -> (RedrawRegistry, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut registry = RedrawRegistry::new();
        registry.register(
            "annotations",
            Box::new(Recorder {
                calls: Rc::clone(&calls),
                per_item,
            }),
        );
        (registry, calls)
    }

    fn apply(root: &mut Value, batch: &EditBatch, hooks: &mut RedrawRegistry) -> EditReport {
        let options = EngineOptions::default();
        let mut editor = ArrayEditor::new(&options, DeletePolicy::default(), hooks);
        editor
            .apply(root, "annotations", batch, EditFlags::default())
            .unwrap()
    }

    fn figure() -> Value {
        json!({"annotations": [{"text": "a"}, {"text": "b"}, {"text": "c"}]})
    }

    #[test]
    fn updates_touch_only_named_indices() {
        let (mut hooks, calls) = registry(true);
        let mut root = figure();
        let batch = EditBatch::new().update(1, "font.size", json!(9));
        let report = apply(&mut root, &batch, &mut hooks);
        assert_eq!(
            root["annotations"],
            json!([{"text": "a"}, {"text": "b", "font": {"size": 9}}, {"text": "c"}])
        );
        assert_eq!(report.redraw_indices, vec![1]);
        assert!(report.applied_in_place);
        assert_eq!(calls.borrow().drawn, vec![1]);
        assert_eq!(calls.borrow().defaults, 1);
    }

    #[test]
    fn insertion_renumbers_later_indices() {
        let (mut hooks, _) = registry(false);
        let mut root = figure();
        let batch = EditBatch::new()
            .insert(1, json!({"text": "new"}))
            .insert(2, json!({"foo": "bar"}));
        apply(&mut root, &batch, &mut hooks);
        assert_eq!(
            root["annotations"],
            json!([{"text": "a"}, {"text": "new"}, {"foo": "bar"}, {"text": "b"}, {"text": "c"}])
        );
        let batch = EditBatch::new()
            .insert(1, json!({"text": "new"}))
            .update(2, "foo", json!("bar"));
        let mut renumbered = figure();
        let report = apply(&mut renumbered, &batch, &mut hooks);
        assert_eq!(
            renumbered["annotations"],
            json!([{"text": "a"}, {"text": "new"}, {"text": "b", "foo": "bar"}, {"text": "c"}])
        );
        assert_eq!(report.redraw_indices, vec![1, 2, 3]);
    }

    #[test]
    fn deletions_run_in_descending_order() {
        let (mut hooks, _) = registry(false);
        let mut root = json!({"annotations": [{"n": 0}, {"n": 1}, {"n": 2}, {"n": 3}]});
        let report = apply(&mut root, &EditBatch::new().remove(0).remove(2), &mut hooks);
        assert_eq!(root, json!({"annotations": [{"n": 1}, {"n": 3}]}));
        assert_eq!(report.redraw_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn remove_marker_and_add_marker() {
        let (mut hooks, _) = registry(false);
        let mut root = figure();
        let batch = EditBatch::new().insert(3, json!("add")).insert(0, json!("remove"));
        apply(&mut root, &batch, &mut hooks);
        assert_eq!(root, json!({"annotations": [{"text": "b"}, {"text": "c"}, {}]}));
    }

    #[test]
    fn out_of_range_entries_are_skipped() {
        let (mut hooks, _) = registry(false);
        let mut root = figure();
        let batch = EditBatch::new()
            .update(3, "text", json!("x"))
            .insert(5, json!("add"))
            .update(0, "text", json!("z"));
        let report = apply(&mut root, &batch, &mut hooks);
        assert_eq!(root["annotations"][0]["text"], json!("z"));
        assert_eq!(root["annotations"].as_array().map(Vec::len), Some(3));
        assert_eq!(report.redraw_indices, vec![0]);
    }

    #[test]
    fn whole_array_edits() {
        let (mut hooks, calls) = registry(true);
        let mut root = figure();
        let batch = EditBatch::new().whole(json!([{"text": "only"}]));
        let report = apply(&mut root, &batch, &mut hooks);
        assert_eq!(root, json!({"annotations": [{"text": "only"}]}));
        assert!(report.applied_in_place);
        assert_eq!(calls.borrow().draws, 1);

        apply(&mut root, &EditBatch::new().whole(json!("remove")), &mut hooks);
        assert_eq!(root, json!({}));
    }

    #[test]
    fn whole_array_wins_over_item_edits() {
        let (mut hooks, _) = registry(false);
        let mut root = figure();
        let batch = EditBatch::new().whole(Value::Null).update(0, "text", json!("x"));
        apply(&mut root, &batch, &mut hooks);
        assert_eq!(root, json!({}));
    }

    #[test]
    fn removing_every_item_drops_the_array() {
        let (mut hooks, _) = registry(false);
        let mut root = json!({"annotations": [{"text": "a"}], "title": "t"});
        apply(&mut root, &EditBatch::new().remove(0), &mut hooks);
        assert_eq!(root, json!({"title": "t"}));
    }

    #[test]
    fn pending_replot_or_missing_hook_defers_to_caller() {
        let options = EngineOptions::default();
        let (mut hooks, calls) = registry(false);
        let mut root = figure();
        let batch = EditBatch::new().update(0, "text", json!("x"));
        let flags = EditFlags {
            replot: true,
            recalc: false,
        };
        let report = ArrayEditor::new(&options, DeletePolicy::default(), &mut hooks)
            .apply(&mut root, "annotations", &batch, flags)
            .unwrap();
        assert!(!report.applied_in_place);
        assert_eq!(root["annotations"][0]["text"], json!("x"));
        assert_eq!(calls.borrow().defaults, 0);

        let mut empty = RedrawRegistry::new();
        let mut root = json!({"shapes": [{}]});
        let report = ArrayEditor::new(&options, DeletePolicy::default(), &mut empty)
            .apply(&mut root, "shapes", &batch, EditFlags::default())
            .unwrap();
        assert!(!report.applied_in_place);
    }

    #[test]
    fn null_inside_args_is_stored_not_deleted() {
        let options = EngineOptions::default();
        let mut hooks = RedrawRegistry::new();
        let mut root = json!({"buttons": [{"args": ["a", 1]}]});
        let batch = EditBatch::new().update(0, "args[1]", Value::Null);
        ArrayEditor::new(&options, DeletePolicy::default(), &mut hooks)
            .apply(&mut root, "buttons", &batch, EditFlags::default())
            .unwrap();
        assert_eq!(root, json!({"buttons": [{"args": ["a", null]}]}));
    }

    #[test]
    fn failed_batch_leaves_the_array_untouched() {
        let (mut hooks, _) = registry(false);
        let options = EngineOptions::default();
        let mut root = json!({"annotations": [{"x": 1}, {"x": 2}, {"x": 3}]});
        let batch = EditBatch::new()
            .remove(0)
            .insert(1, json!("add"))
            .update(3, "x..bad", json!(1));
        let result = ArrayEditor::new(&options, DeletePolicy::default(), &mut hooks).apply(
            &mut root,
            "annotations",
            &batch,
            EditFlags::default(),
        );
        assert!(matches!(result, Err(EditError::Path(_))));
        assert_eq!(root, json!({"annotations": [{"x": 1}, {"x": 2}, {"x": 3}]}));
    }

    #[test]
    fn non_sequence_container_is_an_error() {
        let (mut hooks, _) = registry(false);
        let options = EngineOptions::default();
        let mut root = json!({"annotations": "oops"});
        let result = ArrayEditor::new(&options, DeletePolicy::default(), &mut hooks).apply(
            &mut root,
            "annotations",
            &EditBatch::new().insert(0, json!("add")),
            EditFlags::default(),
        );
        assert!(matches!(result, Err(EditError::NotAnArray { .. })));
    }
}
