//! Attribute paths: parsing, reading, writing and deletion with pruning.

mod error;
mod nested;
mod parse;
mod policy;

pub use error::PathError;
pub use parse::{AttrPath, PathStep, base_key};
pub use policy::{DEFAULT_ARGS_KEY, DEFAULT_INFO_KEYS, DeletePolicy, PathRules};
