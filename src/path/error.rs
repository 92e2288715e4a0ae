/// Failures raised while parsing or writing through an attribute path.
///
/// Reads never produce these: a structurally impossible read is simply an
/// absent value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path string is syntactically malformed.
    #[error("bad property string: '{0}'")]
    BadPropertyString(String),

    /// A numeric index was applied to something that is not a sequence.
    #[error("array index but container is not an array: '{path}'")]
    NotAnArray { path: String },

    /// A key was applied to, or a write went through, a scalar.
    #[error("container is not an object: '{path}'")]
    NotAnObject { path: String },

    /// The root handed to a write is not a map or a sequence.
    #[error("bad container for '{path}'")]
    BadContainer { path: String },
}
