//! Shared identifier types for kiln
//!
//! Defines the ids that tie nodes, scopes and source units together, and the
//! structural [`QualifiedName`] used to match definitions against call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for function literals (the nodes that open a scope)
pub type NodeId = u32;

/// Unique identifier for lexical scopes
pub type ScopeId = u32;

/// Unique identifier for source units
pub type UnitId = u32;

/// A dot-separated path of identifier segments, e.g. `Arrays.$create`.
///
/// Two names are equal iff their segment sequences are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    segments: Vec<String>,
}

/// Error returned when parsing a malformed qualified name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualifiedNameError {
    #[error("qualified name is empty")]
    Empty,
    #[error("qualified name '{0}' has an empty segment")]
    EmptySegment(String),
}

impl QualifiedName {
    /// Build a name from its segments. Returns `None` if there are no
    /// segments or any segment is empty.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root identifier (`Arrays` in `Arrays.$create`)
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The simple name (`$create` in `Arrays.$create`)
    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// True if the name has a qualifying prefix (at least two segments)
    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a name has at least one segment by construction
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append one segment, producing a longer name
    pub fn child(&self, segment: impl Into<String>) -> Option<Self> {
        let segment = segment.into();
        if segment.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.push(segment);
        Some(Self { segments })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for QualifiedName {
    type Err = QualifiedNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(QualifiedNameError::Empty);
        }
        Self::from_segments(s.split('.')).ok_or_else(|| QualifiedNameError::EmptySegment(s.to_string()))
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = QualifiedNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}
