//! Newline framing for the serial byte stream
//!
//! Serial reads return whatever bytes happened to arrive, so a single
//! reading can be split across reads (`"23."` then `"5\n"`) and one read
//! can carry several readings. `LineDecoder` keeps the partial line between
//! reads and hands out complete lines only.
//!
//! ## Framing Rules
//!
//! 1. `\n` ends a line; the delimiter is not part of the line
//! 2. `\r` is dropped wherever it appears, so `\r\n` framing works
//! 3. Empty lines are emitted as empty strings
//! 4. A non-ASCII byte ends the kept text (`Truncation::NonAscii`)
//! 5. Text past the buffer capacity is not kept (`Truncation::Overflow`)
//!
//! A truncated line is still emitted at its newline with the text kept so
//! far, so `"23.5°C"` yields `"23.5"`. The next line decodes normally.
//!
//! ## Example
//!
//! ```rust
//! use thermobridge_core::stream::LineDecoder;
//!
//! let mut decoder: LineDecoder<64> = LineDecoder::new();
//!
//! assert_eq!(decoder.feed(b"23.").count(), 0);
//! assert_eq!(decoder.pending(), "23.");
//!
//! let lines: Vec<_> = decoder.feed(b"5\n").collect();
//! assert_eq!(lines.len(), 1);
//! assert_eq!(lines[0].as_str(), "23.5");
//! ```

use core::convert::Infallible;
use core::ops::Deref;

use heapless::String;

use crate::constants::{CARRIAGE_RETURN, LINE_DELIMITER};
use crate::errors::ReadingResult;
use crate::reading::Reading;
use super::{Stream, Truncation};

/// Statistics for line framing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineStats {
    /// Lines emitted, truncated ones included
    pub lines_decoded: usize,
    /// Lines emitted with only their start kept
    pub lines_truncated: usize,
    /// Bytes consumed, delimiters included
    pub bytes_consumed: usize,
}

/// One decoded line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<const N: usize> {
    text: String<N>,
    truncation: Option<Truncation>,
}

impl<const N: usize> Line<N> {
    /// Kept text, without delimiter or carriage returns
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Why the line was cut, if it was
    pub fn truncation(&self) -> Option<Truncation> {
        self.truncation
    }

    /// Parse the line into a reading
    ///
    /// A line cut for overflow goes through `Reading::parse_truncated`, since
    /// its number may have continued past the buffer. A non-ASCII byte
    /// cannot be part of a number, so those lines parse as usual.
    pub fn reading(&self) -> ReadingResult<Reading> {
        match self.truncation {
            Some(Truncation::Overflow) => Reading::parse_truncated(&self.text),
            Some(Truncation::NonAscii) | None => Reading::parse_line(&self.text),
        }
    }
}

impl<const N: usize> Deref for Line<N> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

/// Incremental line decoder with an `N`-byte line buffer
#[derive(Debug, Clone)]
pub struct LineDecoder<const N: usize> {
    /// Partial line carried across chunks
    line: String<N>,
    /// Set once the current line stops accepting bytes
    truncation: Option<Truncation>,
    /// Statistics
    stats: LineStats,
}

impl<const N: usize> LineDecoder<N> {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self {
            line: String::new(),
            truncation: None,
            stats: LineStats::default(),
        }
    }

    /// Decode the lines completed by `chunk`
    ///
    /// The returned stream must be pulled until it reports `WouldBlock`
    /// (or, as an iterator, returns `None`); bytes not pulled before it is
    /// dropped are discarded.
    pub fn feed<'a>(&'a mut self, chunk: &'a [u8]) -> Lines<'a, N> {
        Lines {
            decoder: self,
            chunk,
            position: 0,
        }
    }

    /// Partial line waiting for its newline
    pub fn pending(&self) -> &str {
        self.line.as_str()
    }

    /// Get statistics
    pub fn stats(&self) -> &LineStats {
        &self.stats
    }

    /// Drop the partial line
    pub fn reset(&mut self) {
        self.line.clear();
        self.truncation = None;
    }

    /// Push one byte, returning the finished line when `byte` is the delimiter
    fn push_byte(&mut self, byte: u8) -> Option<Line<N>> {
        self.stats.bytes_consumed += 1;

        match byte {
            LINE_DELIMITER => Some(self.finish_line()),
            CARRIAGE_RETURN => None,
            _ if self.truncation.is_some() => None,
            _ if !byte.is_ascii() => {
                self.truncation = Some(Truncation::NonAscii);
                None
            }
            _ => {
                if self.line.push(byte as char).is_err() {
                    self.truncation = Some(Truncation::Overflow);
                }
                None
            }
        }
    }

    fn finish_line(&mut self) -> Line<N> {
        let truncation = self.truncation.take();

        self.stats.lines_decoded += 1;
        if truncation.is_some() {
            self.stats.lines_truncated += 1;
        }

        Line {
            text: core::mem::take(&mut self.line),
            truncation,
        }
    }
}

impl<const N: usize> Default for LineDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lines completed by one chunk
pub struct Lines<'a, const N: usize> {
    decoder: &'a mut LineDecoder<N>,
    chunk: &'a [u8],
    position: usize,
}

impl<'a, const N: usize> Stream for Lines<'a, N> {
    type Item = Line<N>;
    type Error = Infallible;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        while let Some(&byte) = self.chunk.get(self.position) {
            self.position += 1;
            if let Some(line) = self.decoder.push_byte(byte) {
                return Ok(line);
            }
        }

        // Chunk exhausted; any partial line stays in the decoder
        Err(nb::Error::WouldBlock)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.chunk.len() - self.position))
    }
}

impl<'a, const N: usize> Iterator for Lines<'a, N> {
    type Item = Line<N>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.poll_next() {
            Ok(line) => Some(line),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(never)) => match never {},
        }
    }
}
