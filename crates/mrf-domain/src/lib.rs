//! MRF Domain Layer - Pure Business Logic
//!
//! This crate contains the pure domain logic for extracting in-network file
//! references from machine-readable price transparency (MRF) index documents.
//! It performs no I/O and knows nothing about async runtimes; the streaming
//! engine in `mrf-core` feeds it one materialized record at a time.
//!
//! ## Architecture
//!
//! - **Value Objects**: Immutable, validated concepts (`PathSelector`, `RegionToken`)
//! - **Entities**: Records taken from the document (`ReportingRecord`, `InNetworkFile`)
//! - **Policy**: Pluggable predicate/projection applied to each record

#![warn(missing_docs)]

pub mod entities;
pub mod policy;
pub mod value_objects;

// Re-export core types
pub use entities::{EnrichedFile, InNetworkFile, OutputValue, ReportingPlan, ReportingRecord};
pub use policy::{PlanRegionPolicy, PolicyConfig, PolicyStats, RecordPolicy};
pub use value_objects::{PathSegment, PathSelector, RegionCodeTable, RegionToken};

/// Domain Result type
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-specific errors
///
/// All domain errors are value types carrying a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DomainError {
    /// A traversed substructure does not have the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// A field value failed validation (e.g. an unparseable URL)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid path selector expression
    #[error("Invalid path selector: {0}")]
    InvalidSelector(String),

    /// Region abbreviation or code that cannot be resolved
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid selector error
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::InvalidSelector(message.into())
    }

    /// Create an invalid region error
    pub fn invalid_region(message: impl Into<String>) -> Self {
        Self::InvalidRegion(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        assert_eq!(
            DomainError::schema("bad").to_string(),
            "Schema error: bad"
        );
        assert!(matches!(
            DomainError::validation("x"),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            DomainError::invalid_selector(""),
            DomainError::InvalidSelector(_)
        ));
    }
}
