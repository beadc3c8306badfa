//! Incremental, path-scoped JSON scanner
//!
//! The scanner validates the whole document byte by byte while keeping only
//! a stack of open containers. Bytes are buffered only for the array element
//! currently being assembled (and for object keys along the selector path);
//! when such an element closes it is materialized with `serde_json` and handed
//! out. Input may be split at any byte boundary.

use crate::{Error, Result, config::PipelineConfig};
use memchr::memchr2;
use mrf_domain::PathSelector;
use serde_json::Value;
use smallvec::SmallVec;

/// What the grammar accepts next, outside of any token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    ValueOrArrayEnd,
    KeyOrObjectEnd,
    Key,
    Colon,
    CommaOrEnd,
    End,
}

/// Position inside a number literal (RFC 8259 grammar)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Number {
    Minus,
    Zero,
    Int,
    Dot,
    Frac,
    Exp,
    ExpSign,
    ExpInt,
}

impl Number {
    fn start(b: u8) -> Option<Self> {
        match b {
            b'-' => Some(Self::Minus),
            b'0' => Some(Self::Zero),
            b'1'..=b'9' => Some(Self::Int),
            _ => None,
        }
    }

    fn step(self, b: u8) -> Option<Self> {
        match (self, b) {
            (Self::Minus, b'0') => Some(Self::Zero),
            (Self::Minus, b'1'..=b'9') => Some(Self::Int),
            (Self::Int, b'0'..=b'9') => Some(Self::Int),
            (Self::Zero | Self::Int, b'.') => Some(Self::Dot),
            (Self::Zero | Self::Int | Self::Frac, b'e' | b'E') => Some(Self::Exp),
            (Self::Dot | Self::Frac, b'0'..=b'9') => Some(Self::Frac),
            (Self::Exp, b'+' | b'-') => Some(Self::ExpSign),
            (Self::Exp | Self::ExpSign | Self::ExpInt, b'0'..=b'9') => Some(Self::ExpInt),
            _ => None,
        }
    }

    fn is_complete(self) -> bool {
        matches!(self, Self::Zero | Self::Int | Self::Frac | Self::ExpInt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode(u8),
}

/// Token currently being lexed
#[derive(Debug, Clone, Copy)]
enum Lex {
    Structural,
    String { key: bool, escape: Escape },
    Number(Number),
    Literal { word: &'static [u8], matched: usize },
}

/// One open container
#[derive(Debug)]
enum Level {
    /// `key` is only tracked at depths the selector can still match
    Object { key: Option<String> },
    Array { index: usize },
}

#[derive(Debug)]
struct Capture {
    buf: Vec<u8>,
    /// Stack depth at which the captured value started
    depth: usize,
    /// Document offset of the first captured byte
    start: u64,
}

/// Counters describing a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Selected elements materialized
    pub elements: u64,
    /// Document bytes consumed
    pub bytes_scanned: u64,
    /// Largest number of bytes buffered for a single element
    pub peak_element_bytes: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_delimiter(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b',' | b']' | b'}')
}

/// Push-style scanner yielding the elements selected by a [`PathSelector`]
#[derive(Debug)]
pub struct ScopedScanner {
    selector: PathSelector,
    stack: SmallVec<[Level; 8]>,
    expect: Expect,
    lex: Lex,
    capture: Option<Capture>,
    key: Option<Vec<u8>>,
    /// Start in the current chunk of bytes not yet copied into `capture`/`key`
    mark: usize,
    /// Document offset of the current chunk's first byte
    offset: u64,
    max_element_bytes: usize,
    max_key_bytes: usize,
    max_depth: usize,
    stats: ScanStats,
}

impl ScopedScanner {
    /// Create a scanner for `selector` with limits taken from `config`
    pub fn new(selector: PathSelector, config: &PipelineConfig) -> Self {
        Self {
            selector,
            stack: SmallVec::new(),
            expect: Expect::Value,
            lex: Lex::Structural,
            capture: None,
            key: None,
            mark: 0,
            offset: 0,
            max_element_bytes: config.max_element_bytes,
            max_key_bytes: config.max_key_bytes,
            max_depth: config.max_depth,
            stats: ScanStats::default(),
        }
    }

    /// Selector this scanner extracts
    pub fn selector(&self) -> &PathSelector {
        &self.selector
    }

    /// Scan statistics so far
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Bytes currently held for a partially assembled element or key
    pub fn buffered_bytes(&self) -> usize {
        self.capture.as_ref().map_or(0, |c| c.buf.len()) + self.key.as_ref().map_or(0, Vec::len)
    }

    /// Scan the next chunk of the document, appending every element that
    /// completed inside it to `out` in document order
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Value>) -> Result<()> {
        self.mark = 0;
        let mut i = 0;

        while i < chunk.len() {
            match self.lex {
                Lex::Structural => {
                    self.structural(chunk, i, out)?;
                    i += 1;
                }
                Lex::String { key, escape } => match escape {
                    Escape::None => match memchr2(b'"', b'\\', &chunk[i..]) {
                        None => i = chunk.len(),
                        Some(rel) => {
                            i += rel;
                            if chunk[i] == b'\\' {
                                self.lex = Lex::String {
                                    key,
                                    escape: Escape::Backslash,
                                };
                                i += 1;
                            } else {
                                self.lex = Lex::Structural;
                                i += 1;
                                if key {
                                    self.end_key(chunk, i)?;
                                } else {
                                    self.end_value(chunk, i, out)?;
                                }
                            }
                        }
                    },
                    Escape::Backslash => {
                        let next = match chunk[i] {
                            b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => Escape::None,
                            b'u' => Escape::Unicode(4),
                            _ => return Err(self.error_at(i, "invalid escape sequence")),
                        };
                        self.lex = Lex::String { key, escape: next };
                        i += 1;
                    }
                    Escape::Unicode(remaining) => {
                        if !chunk[i].is_ascii_hexdigit() {
                            return Err(self.error_at(i, "invalid \\u escape"));
                        }
                        let next = if remaining == 1 {
                            Escape::None
                        } else {
                            Escape::Unicode(remaining - 1)
                        };
                        self.lex = Lex::String { key, escape: next };
                        i += 1;
                    }
                },
                Lex::Number(state) => {
                    let b = chunk[i];
                    if let Some(next) = state.step(b) {
                        self.lex = Lex::Number(next);
                        i += 1;
                    } else if state.is_complete() && is_delimiter(b) {
                        // The delimiter is not part of the number; rescan it
                        self.lex = Lex::Structural;
                        self.end_value(chunk, i, out)?;
                    } else {
                        return Err(self.error_at(i, "invalid number"));
                    }
                }
                Lex::Literal { word, matched } => {
                    if chunk[i] != word[matched] {
                        return Err(self.error_at(i, "invalid literal"));
                    }
                    i += 1;
                    if matched + 1 == word.len() {
                        self.lex = Lex::Structural;
                        self.end_value(chunk, i, out)?;
                    } else {
                        self.lex = Lex::Literal {
                            word,
                            matched: matched + 1,
                        };
                    }
                }
            }
        }

        self.carry_over(chunk)?;
        self.offset += chunk.len() as u64;
        self.stats.bytes_scanned = self.offset;
        Ok(())
    }

    /// Signal end of input; fails unless exactly one complete top-level
    /// value was seen
    pub fn finish(&mut self, out: &mut Vec<Value>) -> Result<()> {
        match self.lex {
            Lex::Structural => {}
            Lex::Number(state) if state.is_complete() => {
                self.lex = Lex::Structural;
                self.mark = 0;
                self.end_value(&[], 0, out)?;
            }
            _ => {
                return Err(Error::parse(
                    self.offset,
                    "unexpected end of input inside a token",
                ));
            }
        }

        if self.expect != Expect::End {
            return Err(Error::parse(self.offset, "unexpected end of input"));
        }
        Ok(())
    }

    fn error_at(&self, i: usize, message: &str) -> Error {
        Error::parse(self.offset + i as u64, message)
    }

    fn structural(&mut self, chunk: &[u8], i: usize, out: &mut Vec<Value>) -> Result<()> {
        let b = chunk[i];
        if is_whitespace(b) {
            return Ok(());
        }

        match self.expect {
            Expect::ValueOrArrayEnd if b == b']' => self.close(b, chunk, i, out),
            Expect::Value | Expect::ValueOrArrayEnd => self.start_value(b, i),
            Expect::KeyOrObjectEnd if b == b'}' => self.close(b, chunk, i, out),
            Expect::KeyOrObjectEnd | Expect::Key => {
                if b != b'"' {
                    return Err(self.error_at(i, "expected object key"));
                }
                if self.capture.is_none() && self.stack.len() <= self.selector.depth() {
                    self.key = Some(Vec::new());
                    self.mark = i;
                }
                self.lex = Lex::String {
                    key: true,
                    escape: Escape::None,
                };
                Ok(())
            }
            Expect::Colon => {
                if b != b':' {
                    return Err(self.error_at(i, "expected ':'"));
                }
                self.expect = Expect::Value;
                Ok(())
            }
            Expect::CommaOrEnd => match b {
                b',' => {
                    let next = match self.stack.last_mut() {
                        Some(Level::Object { .. }) => Some(Expect::Key),
                        Some(Level::Array { index }) => {
                            *index += 1;
                            Some(Expect::Value)
                        }
                        None => None,
                    };
                    match next {
                        Some(next) => {
                            self.expect = next;
                            Ok(())
                        }
                        None => Err(self.error_at(i, "unexpected ','")),
                    }
                }
                b'}' | b']' => self.close(b, chunk, i, out),
                _ => Err(self.error_at(i, "expected ',' or closing bracket")),
            },
            Expect::End => Err(self.error_at(i, "trailing data after JSON document")),
        }
    }

    fn start_value(&mut self, b: u8, i: usize) -> Result<()> {
        let lex = match b {
            b'{' | b'[' => None,
            b'"' => Some(Lex::String {
                key: false,
                escape: Escape::None,
            }),
            b'-' | b'0'..=b'9' => Number::start(b).map(Lex::Number),
            b't' => Some(Lex::Literal {
                word: b"true",
                matched: 1,
            }),
            b'f' => Some(Lex::Literal {
                word: b"false",
                matched: 1,
            }),
            b'n' => Some(Lex::Literal {
                word: b"null",
                matched: 1,
            }),
            _ => return Err(self.error_at(i, "expected a JSON value")),
        };

        self.begin_capture(i);

        match lex {
            Some(lex) => self.lex = lex,
            None if b == b'{' => {
                self.push(Level::Object { key: None }, i)?;
                self.expect = Expect::KeyOrObjectEnd;
            }
            None => {
                self.push(Level::Array { index: 0 }, i)?;
                self.expect = Expect::ValueOrArrayEnd;
            }
        }
        Ok(())
    }

    fn push(&mut self, level: Level, i: usize) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::buffer_limit(format!(
                "JSON nesting depth {} at byte {} exceeds maximum {}",
                self.stack.len() + 1,
                self.offset + i as u64,
                self.max_depth
            )));
        }
        self.stack.push(level);
        Ok(())
    }

    fn close(&mut self, b: u8, chunk: &[u8], i: usize, out: &mut Vec<Value>) -> Result<()> {
        match (self.stack.pop(), b) {
            (Some(Level::Object { .. }), b'}') | (Some(Level::Array { .. }), b']') => {
                self.end_value(chunk, i + 1, out)
            }
            _ => Err(self.error_at(i, "mismatched closing bracket")),
        }
    }

    /// Start buffering if a value beginning at `i` is selected
    fn begin_capture(&mut self, i: usize) {
        if self.capture.is_some() || self.stack.len() != self.selector.depth() {
            return;
        }

        let selected = self
            .selector
            .segments()
            .iter()
            .zip(self.stack.iter())
            .all(|(segment, level)| match level {
                Level::Object { key: Some(key) } => segment.matches_key(key),
                Level::Object { key: None } => false,
                Level::Array { index } => segment.matches_index(*index),
            });

        if selected {
            self.capture = Some(Capture {
                buf: Vec::new(),
                depth: self.stack.len(),
                start: self.offset + i as u64,
            });
            self.mark = i;
        }
    }

    /// A value ended just before `end`; emit it if it was being captured
    fn end_value(&mut self, chunk: &[u8], end: usize, out: &mut Vec<Value>) -> Result<()> {
        match self.capture.take() {
            Some(mut capture) if capture.depth == self.stack.len() => {
                capture.buf.extend_from_slice(&chunk[self.mark..end]);
                self.check_element(capture.buf.len(), capture.start)?;

                let value = serde_json::from_slice(&capture.buf).map_err(|e| {
                    Error::parse(capture.start, format!("selected element is not valid JSON: {e}"))
                })?;
                out.push(value);
                self.stats.elements += 1;
            }
            other => self.capture = other,
        }

        self.expect = if self.stack.is_empty() {
            Expect::End
        } else {
            Expect::CommaOrEnd
        };
        Ok(())
    }

    fn end_key(&mut self, chunk: &[u8], end: usize) -> Result<()> {
        if let Some(mut raw) = self.key.take() {
            raw.extend_from_slice(&chunk[self.mark..end]);
            self.check_key(raw.len())?;

            let key: String = serde_json::from_slice(&raw)
                .map_err(|e| Error::parse(self.offset + end as u64, format!("invalid object key: {e}")))?;
            if let Some(Level::Object { key: slot }) = self.stack.last_mut() {
                *slot = Some(key);
            }
        } else if let Some(Level::Object { key: slot }) = self.stack.last_mut() {
            *slot = None;
        }

        self.expect = Expect::Colon;
        Ok(())
    }

    /// Move the unconsumed tail of `chunk` into the open capture or key
    fn carry_over(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(capture) = self.capture.as_mut() {
            capture.buf.extend_from_slice(&chunk[self.mark..]);
        } else if let Some(key) = self.key.as_mut() {
            key.extend_from_slice(&chunk[self.mark..]);
        }

        if let Some((len, start)) = self.capture.as_ref().map(|c| (c.buf.len(), c.start)) {
            self.check_element(len, start)?;
        }
        if let Some(key) = &self.key {
            self.check_key(key.len())?;
        }
        Ok(())
    }

    fn check_element(&mut self, len: usize, start: u64) -> Result<()> {
        self.stats.peak_element_bytes = self.stats.peak_element_bytes.max(len);
        if len > self.max_element_bytes {
            return Err(Error::buffer_limit(format!(
                "element starting at byte {start} exceeds {} bytes",
                self.max_element_bytes
            )));
        }
        Ok(())
    }

    fn check_key(&self, len: usize) -> Result<()> {
        if len > self.max_key_bytes {
            return Err(Error::buffer_limit(format!(
                "object key exceeds {} bytes",
                self.max_key_bytes
            )));
        }
        Ok(())
    }
}
