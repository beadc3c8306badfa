//! Domain entities
//!
//! Records materialized from the streamed document and the values the
//! pipeline emits for them.

mod record;

pub use record::{EnrichedFile, InNetworkFile, OutputValue, ReportingPlan, ReportingRecord};
