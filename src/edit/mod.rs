//! Incremental edits of container arrays.

mod batch;
mod editor;

pub use batch::{EditBatch, ItemEdit};
pub use editor::{ArrayEditor, ArrayRedraw, EditError, EditFlags, EditReport, RedrawRegistry};
