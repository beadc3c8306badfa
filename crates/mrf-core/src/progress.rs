//! Byte-level progress tracking
//!
//! [`ProgressCounter`] wraps a [`ByteSource`] and reports the running total
//! of bytes read from it to a [`ProgressReporter`]. Chunks pass through
//! unchanged.

use crate::{Result, source::ByteSource};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

/// Snapshot of source consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Bytes read so far
    pub bytes: u64,
    /// Declared source length, if known
    pub total: Option<u64>,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`, when the total is known and non-zero
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.bytes as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Observer of [`Progress`] updates
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first chunk
    fn start(&self, _total: Option<u64>) {}

    /// Called after every chunk with the running totals
    fn advance(&self, progress: &Progress);

    /// Called once when the source reports end of stream
    fn finish(&self, _progress: &Progress) {}
}

/// Reporter that discards updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn advance(&self, _progress: &Progress) {}
}

/// Reporter that logs through `tracing` at fixed steps
///
/// With a known total it logs every `percent_step` percent; otherwise
/// every `byte_step` bytes.
#[derive(Debug)]
pub struct TracingReporter {
    percent_step: u64,
    byte_step: u64,
    last_mark: parking_lot::Mutex<u64>,
}

impl TracingReporter {
    /// Create reporter with the given steps
    pub fn new(percent_step: u64, byte_step: u64) -> Self {
        Self {
            percent_step: percent_step.clamp(1, 100),
            byte_step: byte_step.max(1),
            last_mark: parking_lot::Mutex::new(0),
        }
    }

    fn mark(&self, progress: &Progress) -> u64 {
        match progress.fraction() {
            Some(fraction) => (fraction * 100.0) as u64 / self.percent_step,
            None => progress.bytes / self.byte_step,
        }
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(10, 64 * 1024 * 1024)
    }
}

impl ProgressReporter for TracingReporter {
    fn start(&self, total: Option<u64>) {
        *self.last_mark.lock() = 0;
        info!(total_bytes = ?total, "reading source");
    }

    fn advance(&self, progress: &Progress) {
        let mark = self.mark(progress);
        let mut last = self.last_mark.lock();
        if mark > *last {
            *last = mark;
            match progress.fraction() {
                Some(fraction) => info!(
                    bytes = progress.bytes,
                    percent = (fraction * 100.0).round() as u64,
                    "source progress"
                ),
                None => info!(bytes = progress.bytes, "source progress"),
            }
        }
    }

    fn finish(&self, progress: &Progress) {
        info!(bytes = progress.bytes, "source exhausted");
    }
}

/// Pass-through source that reports consumption
pub struct ProgressCounter<S> {
    inner: S,
    reporter: Arc<dyn ProgressReporter>,
    progress: Progress,
    started: bool,
    finished: bool,
}

impl<S: ByteSource> ProgressCounter<S> {
    /// Wrap `inner`, reporting to `reporter`
    pub fn new(inner: S, reporter: Arc<dyn ProgressReporter>) -> Self {
        let total = inner.total_len();
        Self {
            inner,
            reporter,
            progress: Progress { bytes: 0, total },
            started: false,
            finished: false,
        }
    }

    /// Current totals
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Unwrap the inner source
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> ByteSource for ProgressCounter<S> {
    fn total_len(&self) -> Option<u64> {
        self.progress.total
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if !self.started {
            self.started = true;
            self.reporter.start(self.progress.total);
        }

        let chunk = self.inner.next_chunk().await?;
        match &chunk {
            Some(bytes) => {
                self.progress.bytes += bytes.len() as u64;
                self.reporter.advance(&self.progress);
            }
            None if !self.finished => {
                self.finished = true;
                self.reporter.finish(&self.progress);
            }
            None => {}
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recorder {
        fn start(&self, total: Option<u64>) {
            self.events.lock().push(format!("start {total:?}"));
        }

        fn advance(&self, progress: &Progress) {
            self.events.lock().push(format!("advance {}", progress.bytes));
        }

        fn finish(&self, progress: &Progress) {
            self.events.lock().push(format!("finish {}", progress.bytes));
        }
    }

    #[tokio::test]
    async fn test_counter_reports_running_totals() {
        let recorder = Arc::new(Recorder::default());
        let mut counter = ProgressCounter::new(
            MemorySource::from_chunks(vec!["abc", "de"]),
            recorder.clone(),
        );

        let mut seen = Vec::new();
        while let Some(chunk) = counter.next_chunk().await.unwrap() {
            seen.push(chunk);
        }
        // Repeated end of stream reports once
        assert_eq!(counter.next_chunk().await.unwrap(), None);

        assert_eq!(seen, vec![Bytes::from("abc"), Bytes::from("de")]);
        assert_eq!(
            *recorder.events.lock(),
            vec!["start Some(5)", "advance 3", "advance 5", "finish 5"]
        );
        assert_eq!(counter.progress().fraction(), Some(1.0));
    }

    #[test]
    fn test_fraction_without_total() {
        let progress = Progress {
            bytes: 10,
            total: None,
        };
        assert_eq!(progress.fraction(), None);
        let empty = Progress {
            bytes: 0,
            total: Some(0),
        };
        assert_eq!(empty.fraction(), None);
    }

    #[test]
    fn test_tracing_reporter_marks() {
        let reporter = TracingReporter::new(10, 100);
        let known = Progress {
            bytes: 55,
            total: Some(100),
        };
        assert_eq!(reporter.mark(&known), 5);
        let unknown = Progress {
            bytes: 250,
            total: None,
        };
        assert_eq!(reporter.mark(&unknown), 2);
    }
}
