//! Blocking iterator over selected elements

use crate::{Error, Result, config::PipelineConfig, parser::ScopedScanner};
use mrf_domain::PathSelector;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Lazy, forward-only sequence of the elements selected from a document
///
/// Elements completed before a failure are still yielded, then the error,
/// then nothing.
///
/// # Examples
///
/// ```
/// # use mrf_core::{PipelineConfig, ScopedObjectReader};
/// # use mrf_domain::PathSelector;
/// let doc = br#"{"reporting_structure":[{"id":1},{"id":2}]}"#;
/// let reader = ScopedObjectReader::new(
///     &doc[..],
///     PathSelector::default(),
///     &PipelineConfig::default(),
/// );
/// let ids: Vec<_> = reader.map(|v| v.unwrap()["id"].as_u64().unwrap()).collect();
/// assert_eq!(ids, vec![1, 2]);
/// ```
pub struct ScopedObjectReader<R> {
    reader: R,
    scanner: ScopedScanner,
    buf: Vec<u8>,
    ready: VecDeque<Value>,
    failure: Option<Error>,
    done: bool,
}

impl<R: Read> ScopedObjectReader<R> {
    /// Wrap a reader producing one JSON document
    pub fn new(reader: R, selector: PathSelector, config: &PipelineConfig) -> Self {
        Self {
            reader,
            scanner: ScopedScanner::new(selector, config),
            buf: vec![0; config.chunk_size.max(1)],
            ready: VecDeque::new(),
            failure: None,
            done: false,
        }
    }

    /// Statistics of the underlying scanner
    pub fn stats(&self) -> crate::parser::ScanStats {
        self.scanner.stats()
    }

    fn fill(&mut self) -> Result<()> {
        let n = loop {
            match self.reader.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let mut out = Vec::new();
        let scanned = if n == 0 {
            self.done = true;
            self.scanner.finish(&mut out)
        } else {
            self.scanner.feed(&self.buf[..n], &mut out)
        };
        self.ready.extend(out);
        scanned
    }
}

impl<R: Read> Iterator for ScopedObjectReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.ready.pop_front() {
                return Some(Ok(value));
            }
            if let Some(err) = self.failure.take() {
                self.done = true;
                return Some(Err(err));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fill() {
                self.failure = Some(err);
                self.done = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(chunk_size: usize) -> PipelineConfig {
        PipelineConfig {
            chunk_size,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_yields_elements_across_small_reads() {
        let doc = br#"{"reporting_structure":[{"a":[1,2]},{"b":"x"},{}]}"#;
        let reader = ScopedObjectReader::new(&doc[..], PathSelector::default(), &config(3));
        let values: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(values, vec![json!({"a":[1,2]}), json!({"b":"x"}), json!({})]);
    }

    #[test]
    fn test_yields_complete_elements_before_error() {
        let doc = br#"{"reporting_structure":[{"a":1},{"a":2},{"a":]}"#;
        let mut reader = ScopedObjectReader::new(&doc[..], PathSelector::default(), &config(64));
        assert_eq!(reader.next().unwrap().unwrap(), json!({"a":1}));
        assert_eq!(reader.next().unwrap().unwrap(), json!({"a":2}));
        assert!(matches!(reader.next(), Some(Err(Error::Parse { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_error_is_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk gone"))
            }
        }

        let mut reader = ScopedObjectReader::new(Broken, PathSelector::default(), &config(8));
        assert!(matches!(reader.next(), Some(Err(Error::Io(_)))));
        assert!(reader.next().is_none());
    }
}
