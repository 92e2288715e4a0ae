//! Recognizing attribute strings that address container arrays.
//!
//! `annotations[2].font.size` belongs to the `annotations` container, item
//! `2`, property `font.size`. Registrations are read-only after startup.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{AttrGroup, SchemaNode};

static ITEM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(0|[1-9][0-9]*)\](\.(.+))?$").expect("container suffix pattern")
});

/// Which part of a container array an attribute string addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIndex {
    Whole,
    Item(usize),
}

impl Serialize for ArrayIndex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArrayIndex::Whole => serializer.serialize_str(""),
            ArrayIndex::Item(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// Result of a successful [`ContainerRegistry::locate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerMatch {
    /// Attribute string of the array itself, e.g. `scene2.annotations`.
    pub array: String,
    pub index: ArrayIndex,
    /// Property inside the item; empty for the whole item or array.
    pub property: String,
}

/// Registered root prefixes and nested patterns of container arrays.
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    roots: Vec<String>,
    patterns: Vec<Regex>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_root(&mut self, root: impl Into<String>) -> &mut Self {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
        self
    }

    /// Register an array nested in another structure. The pattern must
    /// match the array's attribute string from its first character.
    pub fn register_pattern(&mut self, pattern: Regex) -> &mut Self {
        self.patterns.push(pattern);
        self
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    /// Derive registrations from the layout schema: top-level arrays become
    /// roots, arrays inside groups become patterns. Numbered subplot groups
    /// (`scene2`) and container items (`updatemenus[1]`) are allowed along
    /// the way.
    pub fn from_schema(layout: &AttrGroup) -> Self {
        let mut registry = Self::new();
        for (key, node) in &layout.attrs {
            match node {
                SchemaNode::Array(array) => {
                    registry.register_root(key.clone());
                    let item_prefix = format!(r"{}\[(0|[1-9][0-9]*)\]", regex::escape(key));
                    registry.collect_nested(&array.item, &item_prefix);
                }
                SchemaNode::Group(group) => {
                    let prefix = group_prefix(key, group);
                    registry.collect_nested(group, &prefix);
                }
                SchemaNode::Value(_) => {}
            }
        }
        registry
    }

    fn collect_nested(&mut self, group: &AttrGroup, prefix: &str) {
        for (key, node) in &group.attrs {
            let escaped = regex::escape(key);
            match node {
                SchemaNode::Array(array) => {
                    let array_pattern = format!(r"{prefix}\.{escaped}");
                    if let Ok(pattern) = Regex::new(&format!("^{array_pattern}")) {
                        self.register_pattern(pattern);
                    }
                    self.collect_nested(
                        &array.item,
                        &format!(r"{array_pattern}\[(0|[1-9][0-9]*)\]"),
                    );
                }
                SchemaNode::Group(child) => {
                    let child_prefix = format!(r"{prefix}\.{}", group_prefix(key, child));
                    self.collect_nested(child, &child_prefix);
                }
                SchemaNode::Value(_) => {}
            }
        }
    }

    /// Split an attribute string into container array, index and property.
    ///
    /// Returns `None` when the string does not address a registered
    /// container array, or addresses one with anything other than
    /// `[<non-negative integer>]` after it.
    pub fn locate(&self, attr: &str) -> Option<ContainerMatch> {
        for pattern in &self.patterns {
            if let Some(found) = pattern.find(attr)
                && found.start() == 0
            {
                return split_suffix(found.as_str(), &attr[found.end()..]);
            }
        }

        let head_end = attr.find('[').unwrap_or(attr.len());
        let head = &attr[..head_end];
        if self.roots.iter().any(|root| root == head) {
            return split_suffix(head, &attr[head_end..]);
        }
        None
    }
}

/// Pattern prefix for a group key, allowing numbered subplot copies.
fn group_prefix(key: &str, group: &AttrGroup) -> String {
    if group.subplot {
        format!(r"{}([2-9]|[1-9][0-9]+)?", regex::escape(key))
    } else {
        regex::escape(key)
    }
}

fn split_suffix(array: &str, suffix: &str) -> Option<ContainerMatch> {
    if suffix.is_empty() {
        return Some(ContainerMatch {
            array: array.to_string(),
            index: ArrayIndex::Whole,
            property: String::new(),
        });
    }
    let captures = ITEM_SUFFIX.captures(suffix)?;
    let index = captures.get(1)?.as_str().parse().ok()?;
    Some(ContainerMatch {
        array: array.to_string(),
        index: ArrayIndex::Item(index),
        property: captures
            .get(3)
            .map_or_else(String::new, |m| m.as_str().to_string()),
    })
}
