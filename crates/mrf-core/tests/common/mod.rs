//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use bytes::Bytes;
use flate2::{Compression as GzLevel, write::GzEncoder};
use mrf_core::{ByteSource, Pipeline, PipelineConfig, Result};
use mrf_domain::{PathSelector, PlanRegionPolicy, PolicyConfig};
use serde_json::json;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

pub const NY_URL: &str =
    "https://anthembcbsny.example/anthem/2024-01_254_39B0_in-network-rates_4_of_9.json.gz?&Expires=1706386972&Signature=abc";
pub const CO_URL: &str =
    "https://anthembcbsco.example/anthem/2024-01_111_39B0_in-network-rates_1_of_2.json.gz";

/// Small buffers so every stage boundary gets exercised
pub fn small_config() -> PipelineConfig {
    PipelineConfig {
        chunk_size: 64,
        channel_capacity: 2,
        decode_input_slice: 32,
        ..PipelineConfig::default()
    }
}

/// Default selector and the PPO / NY policy
pub fn pipeline(config: PipelineConfig) -> Pipeline {
    let policy = PlanRegionPolicy::from_config(&PolicyConfig::default()).unwrap();
    Pipeline::new(PathSelector::default(), Arc::new(policy)).with_config(config)
}

/// One `reporting_structure` element
pub fn record(plan_name: &str, locations: &[&str]) -> serde_json::Value {
    json!({
        "reporting_plans": [{
            "plan_name": plan_name,
            "plan_id_type": "EIN",
            "plan_id": "13-1234567",
            "plan_market_type": "group"
        }],
        "in_network_files": locations
            .iter()
            .map(|location| json!({"description": "in-network file", "location": location}))
            .collect::<Vec<_>>()
    })
}

/// Index document wrapping the given records
pub fn index_document(records: &[serde_json::Value]) -> String {
    serde_json::to_string_pretty(&json!({
        "reporting_entity_name": "Anthem Inc",
        "reporting_entity_type": "health insurance issuer",
        "reporting_structure": records,
        "version": "1.0.0"
    }))
    .unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Parse sink output as the emitted list of strings
pub fn emitted(output: &[u8]) -> Vec<String> {
    serde_json::from_slice(output).expect("output must be a JSON array of strings")
}

/// Lazily generated index with `count` records, one record per chunk.
/// Every `match_every`-th record qualifies and carries one NY location.
pub fn synthetic_index(count: usize, match_every: usize) -> impl Iterator<Item = Bytes> + Send {
    let head = std::iter::once(Bytes::from_static(
        b"{\"reporting_entity_name\":\"Synthetic\",\"reporting_structure\":[",
    ));
    let body = (0..count).map(move |i| {
        let plan = if match_every > 0 && i % match_every == 0 {
            "SYNTH PPO GOLD"
        } else {
            "SYNTH HMO SILVER"
        };
        let separator = if i == 0 { "" } else { "," };
        Bytes::from(format!(
            "{separator}{{\"reporting_plans\":[{{\"plan_name\":\"{plan}\",\"plan_id\":\"{i}\",\"plan_id_type\":\"EIN\"}}],\
             \"in_network_files\":[{{\"description\":\"f\",\"location\":\"https://h.example/x_254_{i}.json.gz\"}}]}}"
        ))
    });
    let tail = std::iter::once(Bytes::from_static(b"],\"version\":\"1.0.0\"}"));
    head.chain(body).chain(tail)
}

/// Source over an iterator of chunks, counting how many were pulled
pub struct CountingSource<I> {
    chunks: I,
    pulled: Arc<AtomicUsize>,
}

impl<I: Iterator<Item = Bytes> + Send> CountingSource<I> {
    pub fn new(chunks: I) -> (Self, Arc<AtomicUsize>) {
        let pulled = Arc::new(AtomicUsize::new(0));
        (
            Self {
                chunks,
                pulled: Arc::clone(&pulled),
            },
            pulled,
        )
    }
}

impl<I: Iterator<Item = Bytes> + Send> ByteSource for CountingSource<I> {
    fn total_len(&self) -> Option<u64> {
        None
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = self.chunks.next();
        if chunk.is_some() {
            self.pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(chunk)
    }
}

/// Sink that never accepts a byte
pub struct StalledSink;

impl AsyncWrite for StalledSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Pending
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

/// Sink that accepts a few bytes at a time and yields between writes
#[derive(Default)]
pub struct TrickleSink {
    pub written: Vec<u8>,
    max_write: usize,
    ready: bool,
}

impl TrickleSink {
    pub fn new(max_write: usize) -> Self {
        Self {
            written: Vec::new(),
            max_write: max_write.max(1),
            ready: false,
        }
    }
}

impl AsyncWrite for TrickleSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        if !self.ready {
            self.ready = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        self.ready = false;
        let n = buf.len().min(self.max_write);
        self.written.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
