//! When does writing a value through a path mean "delete this entry"?

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::containers::{ArrayIndex, ContainerRegistry};
use crate::domain::{AttrGroup, NodeRef};

use super::{AttrPath, PathStep};

/// Keys whose sequences carry plot information rather than data.
pub const DEFAULT_INFO_KEYS: &[&str] = &[
    "domain",
    "range",
    "domain.x",
    "domain.y",
    "range.x",
    "range.y",
    "args",
    "parallels",
];

/// Key of argument sequences handed verbatim to API methods.
pub const DEFAULT_ARGS_KEY: &str = "args";

static DEFAULT_RULES: LazyLock<PathRules> = LazyLock::new(|| {
    let keys: Vec<String> = DEFAULT_INFO_KEYS.iter().map(|k| k.to_string()).collect();
    PathRules::new(&keys, DEFAULT_ARGS_KEY).expect("default path rules")
});

/// Compiled string patterns used by [`DeletePolicy`].
#[derive(Debug, Clone)]
pub struct PathRules {
    info: Regex,
    args: Regex,
}

impl PathRules {
    pub fn new(info_keys: &[String], args_key: &str) -> Result<Self, regex::Error> {
        let alternatives = info_keys
            .iter()
            .map(|key| regex::escape(key))
            .collect::<Vec<_>>()
            .join("|");
        let info = if alternatives.is_empty() {
            // matches nothing
            Regex::new(r"[^\s\S]")?
        } else {
            Regex::new(&format!(r"(^|\.)({alternatives})$"))?
        };
        let args = Regex::new(&format!(r"(^|\.){}\[", regex::escape(args_key)))?;
        Ok(Self { info, args })
    }

    pub fn is_info_path(&self, path: &str) -> bool {
        self.info.is_match(path)
    }

    pub fn is_inside_args(&self, path: &str) -> bool {
        self.args.is_match(path)
    }
}

impl Default for PathRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

/// Decides whether a value written at a path is a deletion.
///
/// * absent and `null` are deletable, except inside an argument sequence
///   where only an absent value deletes;
/// * an empty map is deletable unless it is addressed as a sequence element;
/// * an empty sequence is deletable only when it is an informational
///   sequence (rule list or `isInfoArray` descriptor) or a whole container
///   array; empty sequences inside container items are data.
#[derive(Debug, Clone, Copy)]
pub struct DeletePolicy<'a> {
    rules: &'a PathRules,
    containers: Option<&'a ContainerRegistry>,
    schema: Option<&'a AttrGroup>,
}

impl Default for DeletePolicy<'static> {
    fn default() -> Self {
        Self {
            rules: &DEFAULT_RULES,
            containers: None,
            schema: None,
        }
    }
}

impl<'a> DeletePolicy<'a> {
    pub fn new(rules: &'a PathRules) -> Self {
        Self {
            rules,
            containers: None,
            schema: None,
        }
    }

    #[must_use]
    pub fn with_containers(mut self, containers: &'a ContainerRegistry) -> Self {
        self.containers = Some(containers);
        self
    }

    /// Attribute group consulted for `isInfoArray` descriptors.
    #[must_use]
    pub fn with_schema(mut self, schema: &'a AttrGroup) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn is_deletable(&self, value: Option<&Value>, path: &AttrPath) -> bool {
        let Some(value) = value else {
            return true;
        };
        let path_str = path.to_string();
        if self.rules.is_inside_args(&path_str) {
            return false;
        }
        match value {
            Value::Null => true,
            Value::Object(map) => {
                map.is_empty() && !matches!(path.last(), Some(PathStep::Index(_)))
            }
            Value::Array(items) => items.is_empty() && self.is_info_sequence(path, &path_str),
            _ => false,
        }
    }

    fn is_info_sequence(&self, path: &AttrPath, path_str: &str) -> bool {
        if self.rules.is_info_path(path_str) {
            return true;
        }
        if let Some(schema) = self.schema
            && let Some(NodeRef::Value(descriptor)) = schema.node_at(path.steps())
            && descriptor.is_info_array
        {
            return true;
        }
        self.containers
            .and_then(|registry| registry.locate(path_str))
            .is_some_and(|found| found.index == ArrayIndex::Whole)
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
    fn absent_and_null_are_deletable() {
        let policy = DeletePolicy::default();
        assert!(policy.is_deletable(None, &path("a.b")));
        assert!(policy.is_deletable(Some(&Value::Null), &path("a.b")));
        assert!(!policy.is_deletable(Some(&json!(0)), &path("a.b")));
    }

    #[test]
    fn empty_map_in_sequence_slot_is_a_placeholder() {
        let policy = DeletePolicy::default();
        assert!(policy.is_deletable(Some(&json!({})), &path("a.b")));
        assert!(!policy.is_deletable(Some(&json!({})), &path("a[0]")));
    }

    #[test]
    fn empty_sequences_only_delete_for_info_paths() {
        let policy = DeletePolicy::default();
        assert!(!policy.is_deletable(Some(&json!([])), &path("x")));
        assert!(policy.is_deletable(Some(&json!([])), &path("xaxis.range")));
        assert!(policy.is_deletable(Some(&json!([])), &path("scene.domain.x")));
    }

    #[test]
    fn null_inside_args_is_kept() {
        let policy = DeletePolicy::default();
        assert!(!policy.is_deletable(Some(&Value::Null), &path("buttons[0].args[1]")));
        assert!(policy.is_deletable(None, &path("buttons[0].args[1]")));
    }

    #[test]
    fn whole_container_arrays_are_deletable_when_empty() {
        let mut registry = ContainerRegistry::new();
        registry.register_root("shapes");
        let policy = DeletePolicy::default().with_containers(&registry);
        assert!(policy.is_deletable(Some(&json!([])), &path("shapes")));
        assert!(!policy.is_deletable(Some(&json!([])), &path("shapes[0].path")));
    }
}
