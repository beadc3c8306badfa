//! Byte sources feeding the pipeline
//!
//! A source is an ordered, pull-based sequence of chunks with an optional
//! declared total length. Resolving *which* source to use (local path vs
//! URL) is left to the caller.

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::HttpSource;

use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Abstract, pull-based byte stream
pub trait ByteSource: Send {
    /// Declared total size in bytes, when the source knows it
    fn total_len(&self) -> Option<u64>;

    /// Next chunk in order, or `None` at end of stream
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Framing of the source bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain JSON
    #[default]
    None,
    /// RFC 1952 gzip
    Gzip,
}

impl Compression {
    /// Guess from a file name or URL path (`*.gz` is gzip)
    pub fn from_name(name: &str) -> Self {
        let path = name.split(['?', '#']).next().unwrap_or(name);
        if path.to_ascii_lowercase().ends_with(".gz") {
            Self::Gzip
        } else {
            Self::None
        }
    }
}

/// Source reading fixed-size chunks from any [`AsyncRead`]
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    total: Option<u64>,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    /// Wrap a reader; `total` is reported to progress observers as-is
    pub fn new(reader: R, chunk_size: usize, total: Option<u64>) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            total,
        }
    }
}

/// Local file source
pub type FileSource = ReaderSource<tokio::fs::File>;

impl FileSource {
    /// Open a local file; the total length is the file size
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?
            .len();
        Ok(Self::new(file, chunk_size, Some(size)))
    }
}

impl<R: AsyncRead + Unpin + Send> ByteSource for ReaderSource<R> {
    fn total_len(&self) -> Option<u64> {
        self.total
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(self.chunk_size);
        let n = self.reader.read_buf(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }
}

/// Source over chunks already in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: VecDeque<Bytes>,
    total: u64,
}

impl MemorySource {
    /// Serve the given chunks in order
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let chunks: VecDeque<Bytes> = chunks.into_iter().map(Into::into).collect();
        let total = chunks.iter().map(|c| c.len() as u64).sum();
        Self { chunks, total }
    }

    /// Serve `data` split into `chunk_size` pieces
    pub fn from_bytes(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        let mut data: Bytes = data.into();
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        while !data.is_empty() {
            let take = chunk_size.min(data.len());
            chunks.push(data.split_to(take));
        }
        Self::from_chunks(chunks)
    }
}

impl ByteSource for MemorySource {
    fn total_len(&self) -> Option<u64> {
        Some(self.total)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }
}

/// Source adapting a [`Stream`] of byte chunks; stream errors are
/// reported as transport failures
pub struct StreamSource<S> {
    stream: S,
    total: Option<u64>,
}

impl<S, E> StreamSource<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send,
    E: Display,
{
    /// Wrap a stream
    pub fn new(stream: S, total: Option<u64>) -> Self {
        Self { stream, total }
    }
}

impl<S, E> ByteSource for StreamSource<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send,
    E: Display,
{
    fn total_len(&self) -> Option<u64> {
        self.total
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(Error::transport(e.to_string())),
            None => Ok(None),
        }
    }
}
