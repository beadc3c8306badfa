//! Pipeline configuration
//!
//! Every buffer the pipeline holds is bounded by one of these values, so peak
//! memory is a function of the configuration and the largest selected
//! element, never of the document size.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bounds and sizes used by the streaming pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bytes requested per source read, and the size decoded output is split into
    pub chunk_size: usize,
    /// Capacity of the bounded buffer between each pair of adjacent stages
    pub channel_capacity: usize,
    /// Largest selected array element that may be buffered
    pub max_element_bytes: usize,
    /// Largest object key buffered along the selector path
    pub max_key_bytes: usize,
    /// Deepest JSON nesting the scanner tracks
    pub max_depth: usize,
    /// Compressed bytes fed to the inflater per step
    pub decode_input_slice: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            channel_capacity: 16,
            max_element_bytes: 64 * 1024 * 1024, // 64MB
            max_key_bytes: 64 * 1024,
            max_depth: 128,
            decode_input_slice: 8 * 1024,
        }
    }
}

impl PipelineConfig {
    /// Configuration for low-memory environments
    pub fn low_memory() -> Self {
        Self {
            chunk_size: 16 * 1024,
            channel_capacity: 4,
            max_element_bytes: 8 * 1024 * 1024, // 8MB
            max_key_bytes: 4 * 1024,
            max_depth: 64,
            decode_input_slice: 2 * 1024,
        }
    }

    /// Configuration for high-throughput environments
    pub fn high_throughput() -> Self {
        Self {
            chunk_size: 256 * 1024,
            channel_capacity: 64,
            max_element_bytes: 256 * 1024 * 1024, // 256MB
            max_key_bytes: 64 * 1024,
            max_depth: 256,
            decode_input_slice: 32 * 1024,
        }
    }

    /// Reject zero-sized buffers
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("chunk_size", self.chunk_size),
            ("channel_capacity", self.channel_capacity),
            ("max_element_bytes", self.max_element_bytes),
            ("max_key_bytes", self.max_key_bytes),
            ("max_depth", self.max_depth),
            ("decode_input_slice", self.decode_input_slice),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}
