//! Incremental JSON array output
//!
//! Values are written as they arrive, one per line:
//!
//! ```text
//! [
//! "first",
//! "second"
//! ]
//! ```
//!
//! An empty run produces `[\n]\n`. Nothing is buffered beyond the value
//! being written.

use crate::{Error, Result};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const OPEN: &[u8] = b"[\n";
const SEPARATOR: &[u8] = b",\n";
const CLOSE: &[u8] = b"\n]\n";
const CLOSE_EMPTY: &[u8] = b"]\n";

/// Byte-level framing of a streamed JSON array
#[derive(Debug, Clone, Default)]
pub struct JsonArrayEncoder {
    count: u64,
}

impl JsonArrayEncoder {
    /// Create encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Array prelude
    pub fn open(&self) -> &'static [u8] {
        OPEN
    }

    /// Append the next element, preceded by a separator when needed
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T, buf: &mut Vec<u8>) -> Result<()> {
        if self.count > 0 {
            buf.extend_from_slice(SEPARATOR);
        }
        serde_json::to_writer(&mut *buf, value)
            .map_err(|e| Error::sink(format!("failed to encode value: {e}")))?;
        self.count += 1;
        Ok(())
    }

    /// Array epilogue
    pub fn close(&self) -> &'static [u8] {
        if self.count > 0 { CLOSE } else { CLOSE_EMPTY }
    }

    /// Elements encoded so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Writes a JSON array to an async sink, element by element
pub struct ArrayWriter<W> {
    sink: W,
    encoder: JsonArrayEncoder,
    scratch: Vec<u8>,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin> ArrayWriter<W> {
    /// Wrap a sink; nothing is written until [`begin`](Self::begin)
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            encoder: JsonArrayEncoder::new(),
            scratch: Vec::with_capacity(256),
            bytes_written: 0,
        }
    }

    /// Write the array prelude
    pub async fn begin(&mut self) -> Result<()> {
        let open = self.encoder.open();
        self.put(open).await
    }

    /// Write one element
    pub async fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        self.encoder.encode(value, &mut scratch)?;
        let result = self.put(&scratch).await;
        self.scratch = scratch;
        result
    }

    /// Write the epilogue, then flush and shut the sink down.
    /// Returns the total number of bytes written.
    pub async fn finish(mut self) -> Result<u64> {
        let close = self.encoder.close();
        self.put(close).await?;
        self.sink
            .flush()
            .await
            .map_err(|e| Error::sink(format!("flush failed: {e}")))?;
        self.sink
            .shutdown()
            .await
            .map_err(|e| Error::sink(format!("shutdown failed: {e}")))?;
        Ok(self.bytes_written)
    }

    /// Elements written so far
    pub fn count(&self) -> u64 {
        self.encoder.count()
    }

    async fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink
            .write_all(bytes)
            .await
            .map_err(|e| Error::sink(format!("write failed: {e}")))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrf_domain::OutputValue;

    async fn write_all(values: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = ArrayWriter::new(&mut out);
        writer.begin().await.unwrap();
        for value in values {
            writer.write_value(&OutputValue::new(*value)).await.unwrap();
        }
        let written = writer.finish().await.unwrap();
        assert_eq!(written as usize, out.len());
        out
    }

    #[tokio::test]
    async fn test_empty_array() {
        assert_eq!(write_all(&[]).await, b"[\n]\n");
    }

    #[tokio::test]
    async fn test_single_value() {
        assert_eq!(
            String::from_utf8(write_all(&["https://h/a_254_.json"]).await).unwrap(),
            "[\n\"https://h/a_254_.json\"\n]\n"
        );
    }

    #[tokio::test]
    async fn test_values_are_escaped_and_separated() {
        let out = write_all(&["a", "quote\"d", "b"]).await;
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "[\n\"a\",\n\"quote\\\"d\",\n\"b\"\n]\n"
        );
        let parsed: Vec<String> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, vec!["a", "quote\"d", "b"]);
    }

    #[tokio::test]
    async fn test_writes_reach_sink_in_order() {
        let sink = tokio_test::io::Builder::new()
            .write(b"[\n")
            .write(b"\"x\"")
            .write(b",\n\"y\"")
            .write(b"\n]\n")
            .build();
        let mut writer = ArrayWriter::new(sink);
        writer.begin().await.unwrap();
        writer.write_value("x").await.unwrap();
        writer.write_value("y").await.unwrap();
        assert_eq!(writer.count(), 2);
        assert_eq!(writer.finish().await.unwrap(), 13);
    }

    #[tokio::test]
    async fn test_write_failure_is_sink_error() {
        let sink = tokio_test::io::Builder::new()
            .write(b"[\n")
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "closed",
            ))
            .build();
        let mut writer = ArrayWriter::new(sink);
        writer.begin().await.unwrap();
        let err = writer.write_value("x").await.unwrap_err();
        assert!(matches!(err, Error::Sink(_)), "{err:?}");
    }
}
