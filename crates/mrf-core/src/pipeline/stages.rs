//! Stage bodies wired together by [`Pipeline`](super::Pipeline)
//!
//! Each stage owns its receiving end and its sending end. Dropping the
//! sender on return is what tells the next stage its input is complete.

use crate::{
    Result,
    config::PipelineConfig,
    decompress::GzipDecoder,
    parser::{ScanStats, ScopedScanner},
    serializer::ArrayWriter,
    source::ByteSource,
};
use bytes::Bytes;
use mrf_domain::{OutputValue, PathSelector, RecordPolicy, ReportingRecord};
use serde_json::Value;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, trace};

/// Counters from the filter stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FilterStats {
    pub records: u64,
    pub qualified: u64,
    pub values: u64,
}

/// Forward every chunk until the source is exhausted
pub(crate) async fn read_source<S: ByteSource>(mut source: S, tx: Sender<Bytes>) -> Result<u64> {
    let mut bytes = 0u64;
    while let Some(chunk) = source.next_chunk().await? {
        bytes += chunk.len() as u64;
        if tx.send(chunk).await.is_err() {
            debug!("reader stopped: downstream closed");
            break;
        }
    }
    debug!(bytes, "source exhausted");
    Ok(bytes)
}

/// Inflate gzip chunks into plain JSON chunks
pub(crate) async fn decompress(
    mut rx: Receiver<Bytes>,
    tx: Sender<Bytes>,
    config: &PipelineConfig,
) -> Result<u64> {
    let mut decoder = GzipDecoder::new(config);
    let mut decoded = Vec::new();

    while let Some(chunk) = rx.recv().await {
        // Bounded slices keep the inflated output of each step bounded
        for slice in chunk.chunks(config.decode_input_slice.max(1)) {
            decoder.decode(slice, &mut decoded)?;
            for piece in std::mem::take(&mut decoded) {
                if tx.send(piece).await.is_err() {
                    return Ok(decoder.bytes_out());
                }
            }
        }
    }

    decoder.finish(&mut decoded)?;
    for piece in decoded {
        if tx.send(piece).await.is_err() {
            break;
        }
    }
    debug!(
        compressed = decoder.bytes_in(),
        decoded = decoder.bytes_out(),
        "gzip stream complete"
    );
    Ok(decoder.bytes_out())
}

/// Extract the elements addressed by `selector`, in document order
pub(crate) async fn scan_objects(
    mut rx: Receiver<Bytes>,
    tx: Sender<Value>,
    selector: PathSelector,
    config: &PipelineConfig,
) -> Result<ScanStats> {
    let mut scanner = ScopedScanner::new(selector, config);
    let mut ready = Vec::new();

    while let Some(chunk) = rx.recv().await {
        scanner.feed(&chunk, &mut ready)?;
        for element in ready.drain(..) {
            if tx.send(element).await.is_err() {
                return Ok(scanner.stats());
            }
        }
    }

    scanner.finish(&mut ready)?;
    for element in ready {
        if tx.send(element).await.is_err() {
            break;
        }
    }
    let stats = scanner.stats();
    debug!(
        elements = stats.elements,
        bytes = stats.bytes_scanned,
        peak_element_bytes = stats.peak_element_bytes,
        "document scanned"
    );
    Ok(stats)
}

/// Apply the record policy to each element
pub(crate) async fn filter_records(
    mut rx: Receiver<Value>,
    tx: Sender<OutputValue>,
    policy: &dyn RecordPolicy,
) -> Result<FilterStats> {
    let mut stats = FilterStats::default();

    while let Some(element) = rx.recv().await {
        stats.records += 1;
        let record = ReportingRecord::from_value(element)?;
        if !policy.qualifies(&record) {
            trace!(record = stats.records, "record skipped");
            continue;
        }
        stats.qualified += 1;

        for value in policy.project(&record)? {
            stats.values += 1;
            if tx.send(value).await.is_err() {
                return Ok(stats);
            }
        }
    }
    debug!(
        records = stats.records,
        qualified = stats.qualified,
        values = stats.values,
        "filter stage complete"
    );
    Ok(stats)
}

/// Serialize values into a JSON array on `sink`
pub(crate) async fn write_array<W>(mut rx: Receiver<OutputValue>, sink: W) -> Result<(u64, u64)>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = ArrayWriter::new(sink);
    writer.begin().await?;
    while let Some(value) = rx.recv().await {
        writer.write_value(&value).await?;
    }
    let count = writer.count();
    let bytes = writer.finish().await?;
    Ok((count, bytes))
}
