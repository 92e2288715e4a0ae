#![deny(rust_2018_idioms)]
//! Schema-driven attribute coercion and incremental editing of plot
//! configuration trees.
//!
//! A [`Schema`] declares which attributes exist and what values they
//! accept. On top of it the crate resolves whole figures
//! ([`resolve_figure`]), edits container arrays such as `annotations` in
//! place ([`ArrayEditor`]) and extracts reusable style templates
//! ([`make_template`]). [`AttrEngine`] bundles all of it behind one schema
//! and one set of [`EngineOptions`].

pub mod coerce;
pub mod containers;
pub mod domain;
pub mod edit;
mod engine;
pub mod io;
mod options;
pub mod path;
mod resolve;
pub mod template;

pub use coerce::{
    CoerceError, Coerced, Coercer, check, coerce_value, coerce_with_template, validate,
};
pub use containers::{ArrayIndex, ContainerMatch, ContainerRegistry};
pub use domain::{
    ArraySchema, AttrGroup, Descriptor, Dimensions, EnumValue, InfoItems, NodeRef, Schema,
    SchemaNode, ValueKind, parse_schema,
};
pub use edit::{
    ArrayEditor, ArrayRedraw, EditBatch, EditError, EditFlags, EditReport, ItemEdit,
    RedrawRegistry,
};
pub use engine::{AttrEngine, UpdateOutcome};
pub use io::{
    DocumentFormat, OutputDestination, OutputOptions, emit, parse_document_any,
    parse_document_str, render,
};
pub use options::EngineOptions;
pub use path::{AttrPath, DeletePolicy, PathError, PathRules, PathStep};
pub use resolve::{resolve_figure, resolve_with_template};
pub use template::{
    TemplateIssue, extract_template, make_template, merge_templates, validate_template,
};

pub mod prelude {
    pub use super::{AttrEngine, AttrPath, EditBatch, EditFlags, EngineOptions, Schema};
}
