//! Attribute path strings such as `xaxis.range[0]` or `annotations[-1].x`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::PathError;

/// Non-bracket characters followed by one or more `[n]` groups.
static INDEXED_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]*)((?:\[-?[0-9]*\])+)$").expect("indexed segment pattern")
});

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Key(String),
    Index(usize),
    /// The reserved `[-1]` index: every element of the addressed sequence.
    Wildcard,
}

impl PathStep {
    pub fn is_index(&self) -> bool {
        matches!(self, PathStep::Index(_) | PathStep::Wildcard)
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathStep::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathStep::Index(index) => Some(*index),
            _ => None,
        }
    }
}

/// A parsed attribute path.
///
/// Parsing and interpretation are separate: [`AttrPath::parse`] only builds
/// the typed step list, the `get`/`set` family lives in `path::nested`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttrPath {
    steps: Vec<PathStep>,
}

impl AttrPath {
    /// Parse a path used as a root call target.
    ///
    /// A trailing `[-1]` is rejected here: writing a whole sequence goes
    /// through the sequence itself, not through the wildcard.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let path = Self::parse_steps(raw)?;
        if matches!(path.steps.last(), Some(PathStep::Wildcard)) {
            return Err(PathError::BadPropertyString(raw.to_string()));
        }
        Ok(path)
    }

    fn parse_steps(raw: &str) -> Result<Self, PathError> {
        let bad = || PathError::BadPropertyString(raw.to_string());
        if raw.is_empty() {
            return Err(bad());
        }

        let mut steps = Vec::new();
        for (position, segment) in raw.split('.').enumerate() {
            if let Some(captures) = INDEXED_SEGMENT.captures(segment) {
                let head = captures.get(1).map_or("", |m| m.as_str());
                if !head.is_empty() {
                    steps.push(PathStep::Key(head.to_string()));
                } else if position != 0 {
                    // only the very first segment may start with an index
                    return Err(bad());
                }
                let groups = captures.get(2).map_or("", |m| m.as_str());
                let inner = &groups[1..groups.len() - 1];
                for index in inner.split("][") {
                    steps.push(parse_index(index).ok_or_else(bad)?);
                }
            } else if segment.is_empty() || segment.contains(['[', ']']) {
                return Err(bad());
            } else {
                steps.push(PathStep::Key(segment.to_string()));
            }
        }
        Ok(Self { steps })
    }

    /// The empty path, addressing the root itself.
    #[must_use]
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    #[must_use]
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.steps.is_empty() {
            None
        } else {
            Some(Self {
                steps: self.steps[..self.steps.len() - 1].to_vec(),
            })
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.steps.contains(&PathStep::Wildcard)
    }

    /// Child path addressing `key` below this one.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.steps.push(PathStep::Key(key.into()));
        next
    }

    /// Child path addressing element `index` below this one.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.steps.push(PathStep::Index(index));
        next
    }

    #[must_use]
    pub fn join(&self, tail: &[PathStep]) -> Self {
        let mut next = self.clone();
        next.steps.extend_from_slice(tail);
        next
    }
}

fn parse_index(raw: &str) -> Option<PathStep> {
    if raw == "-1" {
        return Some(PathStep::Wildcard);
    }
    if raw.is_empty() || raw.starts_with('-') {
        return None;
    }
    raw.parse::<usize>().ok().map(PathStep::Index)
}

impl Display for AttrPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(key) if position == 0 => write!(f, "{key}")?,
                PathStep::Key(key) => write!(f, ".{key}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Wildcard => write!(f, "[-1]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for AttrPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strip a trailing run of digits: `xaxis12` becomes `xaxis`.
pub fn base_key(key: &str) -> &str {
    key.trim_end_matches(|c: char| c.is_ascii_digit())
}
