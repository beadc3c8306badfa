//! Path selector value object
//!
//! Identifies the repeated array inside a document whose elements are
//! streamed one by one, e.g. `reporting_structure.*`.

use crate::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`PathSelector`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// `*` - any object key or any array index
    Any,
    /// A literal key. Canonical decimal names also match that array index.
    Name {
        /// Key text as written in the expression
        name: String,
        /// Array index the name denotes, when it is a canonical decimal
        index: Option<usize>,
    },
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            return Self::Any;
        }
        let index = raw
            .parse::<usize>()
            .ok()
            .filter(|i| i.to_string() == raw);
        Self::Name {
            name: raw.to_string(),
            index,
        }
    }

    /// Check whether this segment selects the given object key
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Name { name, .. } => name == key,
        }
    }

    /// Check whether this segment selects the given array index
    pub fn matches_index(&self, position: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Name { index, .. } => *index == Some(position),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Name { name, .. } => f.write_str(name),
        }
    }
}

/// Immutable dot-separated expression selecting the elements of a nested
/// array. Fixed for the lifetime of one pipeline run.
///
/// # Examples
///
/// ```
/// # use mrf_domain::PathSelector;
/// let selector = PathSelector::new("reporting_structure.*").unwrap();
/// assert_eq!(selector.depth(), 2);
/// assert!(PathSelector::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathSelector {
    expression: String,
    segments: Vec<PathSegment>,
}

impl PathSelector {
    /// Parse a selector expression
    pub fn new(expression: impl Into<String>) -> DomainResult<Self> {
        let expression = expression.into();
        let trimmed = expression.trim();

        if trimmed.is_empty() {
            return Err(DomainError::invalid_selector("selector cannot be empty"));
        }

        let mut segments = Vec::new();
        for raw in trimmed.split('.') {
            if raw.is_empty() {
                return Err(DomainError::invalid_selector(format!(
                    "empty segment in '{trimmed}'"
                )));
            }
            segments.push(PathSegment::parse(raw));
        }

        Ok(Self {
            expression: trimmed.to_string(),
            segments,
        })
    }

    /// Selector segments, outermost first
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Nesting depth of the selected elements (number of segments)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Original expression
    pub fn as_str(&self) -> &str {
        &self.expression
    }
}

impl Default for PathSelector {
    fn default() -> Self {
        Self {
            expression: "reporting_structure.*".to_string(),
            segments: vec![
                PathSegment::parse("reporting_structure"),
                PathSegment::Any,
            ],
        }
    }
}

impl FromStr for PathSelector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PathSelector {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PathSelector> for String {
    fn from(selector: PathSelector) -> Self {
        selector.expression
    }
}

impl fmt::Display for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
