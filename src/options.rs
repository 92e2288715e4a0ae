use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{DEFAULT_ARGS_KEY, DEFAULT_INFO_KEYS, PathRules};

/// Tunable literals of the engine.
///
/// Deserializes from camelCase documents; every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Edit directive inserting an empty item.
    pub add_marker: String,
    /// Edit directive deleting an item or the whole array. `null` always
    /// deletes as well.
    pub remove_marker: String,
    /// Attribute switched off on items naming a template entry that does
    /// not exist.
    pub inclusion_attr: String,
    /// Attribute strings whose empty sequences are deletions.
    pub info_array_patterns: Vec<String>,
    /// Key of argument sequences in which `null` is kept.
    pub args_key: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            add_marker: "add".to_string(),
            remove_marker: "remove".to_string(),
            inclusion_attr: "visible".to_string(),
            info_array_patterns: DEFAULT_INFO_KEYS.iter().map(|key| key.to_string()).collect(),
            args_key: DEFAULT_ARGS_KEY.to_string(),
        }
    }
}

impl EngineOptions {
    pub fn with_add_marker(mut self, marker: impl Into<String>) -> Self {
        self.add_marker = marker.into();
        self
    }

    pub fn with_remove_marker(mut self, marker: impl Into<String>) -> Self {
        self.remove_marker = marker.into();
        self
    }

    pub fn with_inclusion_attr(mut self, attr: impl Into<String>) -> Self {
        self.inclusion_attr = attr.into();
        self
    }

    pub fn with_info_array_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info_array_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_args_key(mut self, key: impl Into<String>) -> Self {
        self.args_key = key.into();
        self
    }

    pub fn is_add(&self, value: &Value) -> bool {
        value.as_str() == Some(self.add_marker.as_str())
    }

    pub fn is_remove(&self, value: &Value) -> bool {
        value.is_null() || value.as_str() == Some(self.remove_marker.as_str())
    }

    pub fn path_rules(&self) -> Result<PathRules, regex::Error> {
        PathRules::new(&self.info_array_patterns, &self.args_key)
    }
}
