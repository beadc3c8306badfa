//! Streaming orchestrator
//!
//! A run is a chain of stages connected by bounded channels:
//!
//! ```text
//! source -> [gzip] -> element scanner -> record filter -> array writer
//! ```
//!
//! All stages are polled concurrently by one task. The first stage to fail
//! ends the run: the other stages are dropped where they stand, so a failed
//! run never writes the closing bracket. A slow sink fills the channels and
//! stalls the source read loop.

mod stages;

use crate::{
    Result,
    config::PipelineConfig,
    progress::{NoopReporter, ProgressCounter, ProgressReporter},
    source::{ByteSource, Compression},
};
use mrf_domain::{PathSelector, RecordPolicy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Bytes pulled from the source
    pub bytes_read: u64,
    /// Bytes produced by the gzip stage, when the source was compressed
    pub bytes_decoded: Option<u64>,
    /// Elements extracted at the selector path
    pub elements: u64,
    /// Largest buffered element, in bytes
    pub peak_element_bytes: usize,
    /// Elements accepted by the policy predicate
    pub records_qualified: u64,
    /// Values written to the output array
    pub values_emitted: u64,
    /// Bytes written to the sink
    pub bytes_written: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Configured extraction run
///
/// ```no_run
/// # async fn demo() -> mrf_core::Result<()> {
/// use mrf_core::{Pipeline, source::{Compression, FileSource}};
/// use mrf_domain::{PathSelector, PlanRegionPolicy, PolicyConfig};
/// use std::sync::Arc;
///
/// let policy = PlanRegionPolicy::from_config(&PolicyConfig::default())?;
/// let pipeline = Pipeline::new(PathSelector::default(), Arc::new(policy))
///     .with_compression(Compression::Gzip);
///
/// let source = FileSource::open("index.json.gz", 64 * 1024).await?;
/// let sink = tokio::fs::File::create("output.json").await?;
/// let report = pipeline.run(source, sink).await?;
/// println!("{} urls in {:?}", report.values_emitted, report.elapsed);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    selector: PathSelector,
    policy: Arc<dyn RecordPolicy>,
    compression: Compression,
    reporter: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    /// Create pipeline with default configuration, no decompression and no
    /// progress reporting
    pub fn new(selector: PathSelector, policy: Arc<dyn RecordPolicy>) -> Self {
        Self {
            config: PipelineConfig::default(),
            selector,
            policy,
            compression: Compression::None,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Replace the buffer configuration
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how the source bytes are framed
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Report source consumption to `reporter`
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Buffer configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stream `source` through the stages into `sink`
    pub async fn run<S, W>(&self, source: S, sink: W) -> Result<PipelineReport>
    where
        S: ByteSource,
        W: AsyncWrite + Unpin + Send,
    {
        self.config.validate()?;
        let started = Instant::now();
        let capacity = self.config.channel_capacity;

        info!(
            selector = %self.selector,
            compression = ?self.compression,
            channel_capacity = capacity,
            total_bytes = ?source.total_len(),
            "starting extraction"
        );

        let source = ProgressCounter::new(source, Arc::clone(&self.reporter));
        let (json_tx, json_rx) = mpsc::channel(capacity);
        let (element_tx, element_rx) = mpsc::channel(capacity);
        let (value_tx, value_rx) = mpsc::channel(capacity);

        let (source_tx, gzip) = match self.compression {
            Compression::Gzip => {
                let (tx, rx) = mpsc::channel(capacity);
                (tx, Some(stages::decompress(rx, json_tx, &self.config)))
            }
            Compression::None => (json_tx, None),
        };
        let gzip = async move {
            match gzip {
                Some(stage) => stage.await.map(Some),
                None => Ok(None),
            }
        };

        let outcome = tokio::try_join!(
            stages::read_source(source, source_tx),
            gzip,
            stages::scan_objects(json_rx, element_tx, self.selector.clone(), &self.config),
            stages::filter_records(element_rx, value_tx, self.policy.as_ref()),
            stages::write_array(value_rx, sink),
        );

        let (bytes_read, bytes_decoded, scan, filter, (values_emitted, bytes_written)) =
            match outcome {
                Ok(results) => results,
                Err(err) => {
                    debug!(stage = err.stage(), error = %err, "extraction aborted");
                    return Err(err);
                }
            };

        self.policy.finish();
        if scan.elements == 0 {
            warn!(selector = %self.selector, "selector matched no elements");
        }

        let report = PipelineReport {
            bytes_read,
            bytes_decoded,
            elements: scan.elements,
            peak_element_bytes: scan.peak_element_bytes,
            records_qualified: filter.qualified,
            values_emitted,
            bytes_written,
            elapsed: started.elapsed(),
        };
        info!(
            bytes_read = report.bytes_read,
            elements = report.elements,
            qualified = report.records_qualified,
            emitted = report.values_emitted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "extraction complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, source::MemorySource};
    use mrf_domain::{PlanRegionPolicy, PolicyConfig};

    fn pipeline() -> Pipeline {
        let policy = PlanRegionPolicy::from_config(&PolicyConfig::default()).unwrap();
        Pipeline::new(PathSelector::default(), Arc::new(policy)).with_config(PipelineConfig {
            chunk_size: 16,
            channel_capacity: 2,
            ..PipelineConfig::default()
        })
    }

    const DOC: &str = r#"{
        "reporting_entity_name": "Acme",
        "reporting_structure": [
            {
                "reporting_plans": [{"plan_name": "ACME PPO GOLD", "plan_id": "1", "plan_id_type": "EIN"}],
                "in_network_files": [
                    {"description": "ny", "location": "https://h.example/2024-01_254_39B0_in-network-rates.json.gz"},
                    {"description": "co", "location": "https://h.example/2024-01_111_39B0_in-network-rates.json.gz"}
                ]
            },
            {
                "reporting_plans": [{"plan_name": "ACME HMO"}],
                "in_network_files": [{"location": "https://h.example/2024-01_254_hmo.json.gz"}]
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_run_emits_matching_locations() {
        let mut out = Vec::new();
        let report = pipeline()
            .run(MemorySource::from_bytes(DOC, 7), &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[\n\"https://h.example/2024-01_254_39B0_in-network-rates.json.gz\"\n]\n"
        );
        assert_eq!(report.bytes_read, DOC.len() as u64);
        assert_eq!(report.bytes_decoded, None);
        assert_eq!(report.elements, 2);
        assert_eq!(report.records_qualified, 1);
        assert_eq!(report.values_emitted, 1);
    }

    #[tokio::test]
    async fn test_failed_run_leaves_array_open() {
        let doc = r#"{"reporting_structure": [
            {"reporting_plans": [{"plan_name": "A PPO B"}], "in_network_files": [{"location": "https://h/x_254_.json"}]},
            {"reporting_plans": [{"plan_name": "A PPO B"}], "in_network_files": [{"location": "::bad::"}]}
        ]}"#;
        let mut out = Vec::new();
        let err = pipeline()
            .run(MemorySource::from_bytes(doc, 5), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)), "{err:?}");
        assert!(!String::from_utf8_lossy(&out).contains(']'));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_reading() {
        let pipeline = pipeline().with_config(PipelineConfig {
            chunk_size: 0,
            ..PipelineConfig::default()
        });
        let err = pipeline
            .run(MemorySource::from_bytes(DOC, 7), Vec::<u8>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
