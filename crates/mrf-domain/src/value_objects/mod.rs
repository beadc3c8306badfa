//! Domain Value Objects
//!
//! Immutable objects that represent concepts in the domain
//! with no conceptual identity, only defined by their attributes.

mod path_selector;
mod region;

pub use path_selector::{PathSegment, PathSelector};
pub use region::{RegionCodeTable, RegionToken};
