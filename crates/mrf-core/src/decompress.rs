//! Incremental gzip decoding
//!
//! [`GzipDecoder`] is push-based: compressed slices go in, decoded chunks of
//! at most `chunk_size` bytes come out. Concatenated members decode as one
//! stream. Framing and CRC errors surface as [`Error::Decode`]; the last
//! trailer is verified by [`GzipDecoder::finish`].

use crate::{Error, Result, config::PipelineConfig};
use bytes::Bytes;
use flate2::write::MultiGzDecoder;
use std::io::Write;

/// Streaming RFC 1952 decoder for a series of gzip members
pub struct GzipDecoder {
    decoder: MultiGzDecoder<Vec<u8>>,
    chunk_size: usize,
    bytes_in: u64,
    bytes_out: u64,
}

impl GzipDecoder {
    /// Create decoder sized by the pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            decoder: MultiGzDecoder::new(Vec::new()),
            chunk_size: config.chunk_size.max(1),
            bytes_in: 0,
            bytes_out: 0,
        }
    }

    /// Compressed bytes consumed
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Decoded bytes produced
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Feed compressed bytes, appending any decoded chunks to `out`
    ///
    /// Output produced by one call is proportional to `input`; callers that
    /// need a bound on it feed bounded slices.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<Bytes>) -> Result<()> {
        // Bytes after a member must start another valid member header
        self.decoder.write_all(input).map_err(|e| {
            Error::decode(format!(
                "invalid gzip stream near compressed byte {}: {e}",
                self.bytes_in
            ))
        })?;
        self.bytes_in += input.len() as u64;
        self.drain(out);
        Ok(())
    }

    /// Signal end of input: flushes remaining output and checks the trailer
    pub fn finish(&mut self, out: &mut Vec<Bytes>) -> Result<()> {
        self.decoder
            .try_finish()
            .map_err(|e| Error::decode(format!("incomplete or corrupt gzip stream: {e}")))?;
        self.drain(out);
        Ok(())
    }

    fn drain(&mut self, out: &mut Vec<Bytes>) {
        let decoded = std::mem::take(self.decoder.get_mut());
        if decoded.is_empty() {
            return;
        }
        self.bytes_out += decoded.len() as u64;

        let mut decoded = Bytes::from(decoded);
        while !decoded.is_empty() {
            let take = self.chunk_size.min(decoded.len());
            out.push(decoded.split_to(take));
        }
    }
}
