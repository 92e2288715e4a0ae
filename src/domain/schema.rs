use indexmap::IndexMap;

use crate::path::{PathStep, base_key};

use super::descriptor::{Descriptor, Dimensions, InfoItems, ValueKind};

/// A node of the schema tree.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Value(Descriptor),
    Group(AttrGroup),
    Array(ArraySchema),
}

impl SchemaNode {
    pub fn view(&self) -> NodeRef<'_> {
        match self {
            SchemaNode::Value(descriptor) => NodeRef::Value(descriptor),
            SchemaNode::Group(group) => NodeRef::Group(group),
            SchemaNode::Array(array) => NodeRef::Array(array),
        }
    }
}

/// Borrowed view of a schema node, as returned by path lookups.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Value(&'a Descriptor),
    Group(&'a AttrGroup),
    Array(&'a ArraySchema),
}

impl<'a> NodeRef<'a> {
    pub fn descriptor(self) -> Option<&'a Descriptor> {
        match self {
            NodeRef::Value(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// Whether both refer to the very same schema node.
    pub fn same(self, other: NodeRef<'_>) -> bool {
        match (self, other) {
            (NodeRef::Value(a), NodeRef::Value(b)) => std::ptr::eq(a, b),
            (NodeRef::Group(a), NodeRef::Group(b)) => std::ptr::eq(a, b),
            (NodeRef::Array(a), NodeRef::Array(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

/// A map of attribute names to schema nodes.
#[derive(Debug, Clone, Default)]
pub struct AttrGroup {
    pub attrs: IndexMap<String, SchemaNode>,
    /// May appear under numbered keys (`xaxis`, `xaxis2`, ...).
    pub subplot: bool,
    pub no_templating: bool,
}

impl AttrGroup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.attrs.insert(name.into(), node);
        self
    }

    #[must_use]
    pub fn with_value(self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.with_attr(name, SchemaNode::Value(descriptor))
    }

    #[must_use]
    pub fn subplot(mut self) -> Self {
        self.subplot = true;
        self
    }

    /// Look up a direct child, letting `xaxis2` resolve to a subplot group
    /// registered as `xaxis`.
    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        if let Some(node) = self.attrs.get(key) {
            return Some(node);
        }
        let base = base_key(key);
        if base.len() == key.len() {
            return None;
        }
        match self.attrs.get(base) {
            Some(node @ SchemaNode::Group(group)) if group.subplot => Some(node),
            _ => None,
        }
    }

    pub fn descriptor(&self, key: &str) -> Option<&Descriptor> {
        match self.get(key) {
            Some(SchemaNode::Value(descriptor)) => Some(descriptor),
            _ => None,
        }
    }

    /// Find the schema node for a path into values described by this group.
    ///
    /// Index steps after a container array select its item schema; index
    /// steps into an info sequence select the element descriptor. Any
    /// remaining steps below a plain descriptor are ignored, so
    /// `marker.color[3]` finds `marker.color`.
    pub fn node_at(&self, steps: &[PathStep]) -> Option<NodeRef<'_>> {
        let mut node = NodeRef::Group(self);
        let mut position = 0;
        while position < steps.len() {
            let step = &steps[position];
            node = match node {
                NodeRef::Group(group) => group.get(step.as_key()?)?.view(),
                NodeRef::Array(array) => {
                    if !step.is_index() {
                        return None;
                    }
                    NodeRef::Group(&array.item)
                }
                NodeRef::Value(descriptor) => {
                    if !step.is_index() {
                        return Some(node);
                    }
                    match info_element(descriptor, steps, position) {
                        Some((element, consumed)) => {
                            position += consumed - 1;
                            NodeRef::Value(element)
                        }
                        None => return Some(node),
                    }
                }
            };
            position += 1;
        }
        Some(node)
    }
}

/// Element descriptor of an info sequence addressed at `steps[position..]`,
/// with the number of index steps it took.
fn info_element<'a>(
    descriptor: &'a Descriptor,
    steps: &[PathStep],
    position: usize,
) -> Option<(&'a Descriptor, usize)> {
    if descriptor.kind != ValueKind::InfoArray {
        return None;
    }
    let items = descriptor.items.as_ref()?;
    let first = steps[position].as_index().unwrap_or(0);
    let second = steps
        .get(position + 1)
        .filter(|step| step.is_index())
        .map(|step| step.as_index().unwrap_or(0));

    match (descriptor.dimensions, second) {
        (Dimensions::Two | Dimensions::OneOrTwo, Some(column)) => {
            items.at2(first, column).map(|element| (element, 2))
        }
        (Dimensions::Two, None) => None,
        _ => match items {
            InfoItems::Grid(_) => None,
            _ => items.at(first).map(|element| (element, 1)),
        },
    }
}

/// A container array: a sequence of items sharing one item schema.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    /// Singular item name, e.g. `annotation` for `annotations`.
    pub item_name: String,
    pub item: AttrGroup,
}

/// The immutable registry of trace types and layout attributes.
///
/// Built once and passed by reference into every engine call.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub traces: IndexMap<String, AttrGroup>,
    pub layout: AttrGroup,
}

impl Schema {
    pub fn new(layout: AttrGroup) -> Self {
        Self {
            traces: IndexMap::new(),
            layout,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, name: impl Into<String>, attributes: AttrGroup) -> Self {
        self.traces.insert(name.into(), attributes);
        self
    }

    pub fn trace(&self, trace_type: &str) -> Option<&AttrGroup> {
        self.traces.get(trace_type)
    }

    pub fn trace_types(&self) -> impl Iterator<Item = &str> {
        self.traces.keys().map(String::as_str)
    }

    /// `scatter` when registered, otherwise the first registered type.
    pub fn default_trace_type(&self) -> Option<&str> {
        if self.traces.contains_key("scatter") {
            return Some("scatter");
        }
        self.trace_types().next()
    }

    /// The registered type named by a trace's `type` input, falling back to
    /// [`Schema::default_trace_type`].
    pub fn resolve_trace_type(&self, requested: Option<&serde_json::Value>) -> Option<&str> {
        if let Some(requested) = requested.and_then(serde_json::Value::as_str)
            && let Some((name, _)) = self.traces.get_key_value(requested)
        {
            return Some(name.as_str());
        }
        self.default_trace_type()
    }

    pub fn layout_node(&self, steps: &[PathStep]) -> Option<NodeRef<'_>> {
        self.layout.node_at(steps)
    }

    pub fn trace_node(&self, trace_type: &str, steps: &[PathStep]) -> Option<NodeRef<'_>> {
        self.trace(trace_type)?.node_at(steps)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::path::AttrPath;

    fn layout() -> AttrGroup {
        let range = Descriptor::new(ValueKind::InfoArray).with_items(InfoItems::Positional(vec![
            Descriptor::new(ValueKind::Number),
            Descriptor::new(ValueKind::String),
        ]));
        let axis = AttrGroup::new()
            .subplot()
            .with_value("range", range)
            .with_value("color", Descriptor::new(ValueKind::Color).array_ok());
        let annotation = AttrGroup::new().with_value(
            "text",
            Descriptor::new(ValueKind::String).with_default(json!("")),
        );
        AttrGroup::new()
            .with_attr("xaxis", SchemaNode::Group(axis))
            .with_attr(
                "annotations",
                SchemaNode::Array(ArraySchema {
                    item_name: "annotation".into(),
                    item: annotation,
                }),
            )
            .with_attr("title", SchemaNode::Group(AttrGroup::new()))
    }

    fn kind_at(group: &AttrGroup, raw: &str) -> Option<ValueKind> {
        let path = AttrPath::parse(raw).unwrap();
        group.node_at(path.steps())?.descriptor().map(|d| d.kind)
    }

    #[test]
    fn numbered_subplot_keys_use_base_group() {
        let group = layout();
        assert_eq!(kind_at(&group, "xaxis3.range"), Some(ValueKind::InfoArray));
        assert!(group.get("title2").is_none());
    }

    #[test]
    fn container_items_skip_one_index() {
        let group = layout();
        assert_eq!(kind_at(&group, "annotations[4].text"), Some(ValueKind::String));
        assert!(kind_at(&group, "annotations.text").is_none());
        assert!(matches!(
            group.node_at(AttrPath::parse("annotations").unwrap().steps()),
            Some(NodeRef::Array(_))
        ));
    }

    #[test]
    fn info_sequences_resolve_positions() {
        let group = layout();
        assert_eq!(kind_at(&group, "xaxis.range[1]"), Some(ValueKind::String));
        assert_eq!(kind_at(&group, "xaxis.range[7]"), Some(ValueKind::InfoArray));
    }

    #[test]
    fn lookups_stop_at_deepest_descriptor() {
        let group = layout();
        assert_eq!(kind_at(&group, "xaxis.color[3]"), Some(ValueKind::Color));
        assert!(kind_at(&group, "xaxis.missing").is_none());
    }

    #[test]
    fn default_trace_type_prefers_scatter() {
        let schema = Schema::new(AttrGroup::new())
            .with_trace("bar", AttrGroup::new())
            .with_trace("scatter", AttrGroup::new());
        assert_eq!(schema.default_trace_type(), Some("scatter"));
        let bars = Schema::new(AttrGroup::new()).with_trace("bar", AttrGroup::new());
        assert_eq!(bars.default_trace_type(), Some("bar"));
    }

    #[test]
    fn unknown_trace_types_fall_back() {
        let schema = Schema::new(AttrGroup::new())
            .with_trace("bar", AttrGroup::new())
            .with_trace("scatter", AttrGroup::new());
        assert_eq!(schema.resolve_trace_type(Some(&json!("bar"))), Some("bar"));
        assert_eq!(schema.resolve_trace_type(Some(&json!("nope"))), Some("scatter"));
        assert_eq!(schema.resolve_trace_type(Some(&json!(1))), Some("scatter"));
        assert_eq!(schema.resolve_trace_type(None), Some("scatter"));
        assert_eq!(Schema::default().resolve_trace_type(None), None);
    }
}
