mod descriptor;
mod parser;
mod schema;

pub use descriptor::{Descriptor, Dimensions, EnumValue, InfoItems, ValueKind};
pub use parser::parse_schema;
pub use schema::{ArraySchema, AttrGroup, NodeRef, Schema, SchemaNode};

impl Schema {
    /// Parse a plot-schema document; see [`parse_schema`].
    pub fn from_value(value: &serde_json::Value) -> anyhow::Result<Self> {
        parse_schema(value)
    }
}
