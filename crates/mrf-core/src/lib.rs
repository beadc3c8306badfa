//! # MRF Core
//!
//! Bounded-memory streaming engine for machine-readable price transparency
//! index documents. Bytes flow from a [`ByteSource`] through optional gzip
//! decoding, a path-scoped JSON element scanner and a [`RecordPolicy`],
//! and are written out as an incremental JSON array.
//!
//! Memory use is governed by [`PipelineConfig`] and the size of the largest
//! selected element, independent of the document size.
//!
//! [`RecordPolicy`]: mrf_domain::RecordPolicy

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

pub mod config;
pub mod decompress;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod serializer;
pub mod source;

// Error and configuration exports
pub use config::PipelineConfig;
pub use error::{Error, Result};

// Streaming building blocks
pub use decompress::GzipDecoder;
pub use parser::{ScanStats, ScopedObjectReader, ScopedScanner};
pub use serializer::{ArrayWriter, JsonArrayEncoder};

// Orchestration exports
pub use pipeline::{Pipeline, PipelineReport};
pub use progress::{NoopReporter, Progress, ProgressCounter, ProgressReporter, TracingReporter};
pub use source::{ByteSource, Compression, FileSource, MemorySource, ReaderSource, StreamSource};

#[cfg(feature = "http-client")]
pub use source::HttpSource;

// Domain re-exports for convenience
pub use mrf_domain::{
    OutputValue, PathSelector, PlanRegionPolicy, PolicyConfig, RecordPolicy, RegionToken,
    ReportingRecord,
};
