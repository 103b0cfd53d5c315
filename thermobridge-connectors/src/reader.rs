//! Serial temperature reader
//!
//! Owns the serial channel for the lifetime of the process and turns its
//! bytes into cache updates. Each decoded line is parsed by its numeric
//! prefix; lines that do not yield a finite number are counted and logged
//! but never touch the cached reading. A truncated line (non-ASCII suffix
//! or longer than the line buffer) is logged at warn and still parsed from
//! the text the decoder kept.
//!
//! When the link goes away (EOF or a read error) the reader stops polling
//! and the last reading stays cached. There is no reconnect.

use std::sync::Arc;

use log::{debug, warn};
use thermobridge_core::{
    constants::{DEFAULT_READ_CHUNK_SIZE, LINE_BUFFER_CAPACITY},
    LineDecoder, LineStats, Reading, ReadingCache, ReadingError, ReadingResult,
};

use crate::config::SerialConfig;
use crate::serial::SerialConnector;
use crate::{ConnectorError, SerialChannel};

/// Statistics for reading ingestion
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    /// Lines that replaced the cached reading
    pub readings_accepted: usize,
    /// Lines without a usable number
    pub parse_errors: usize,
}

/// Reads temperature lines from a serial channel into a shared cache
pub struct SerialTemperatureReader<C> {
    channel: C,
    decoder: LineDecoder<LINE_BUFFER_CAPACITY>,
    cache: Arc<ReadingCache>,
    buffer: Vec<u8>,
    stats: IngestStats,
    link_lost: bool,
}

impl SerialTemperatureReader<SerialConnector> {
    /// Open the serial port and start with a 0.0 reading
    pub fn open(config: SerialConfig) -> Result<Self, ConnectorError> {
        let read_buffer = config.read_buffer;
        let connector = SerialConnector::open(config)?;
        Ok(Self::new(connector).with_read_buffer(read_buffer))
    }
}

impl<C: SerialChannel> SerialTemperatureReader<C> {
    /// Wrap an already open channel with a fresh cache
    pub fn new(channel: C) -> Self {
        Self::with_cache(channel, Arc::new(ReadingCache::new()))
    }

    /// Wrap a channel and write into an existing cache
    pub fn with_cache(channel: C, cache: Arc<ReadingCache>) -> Self {
        Self {
            channel,
            decoder: LineDecoder::new(),
            cache,
            buffer: vec![0; DEFAULT_READ_CHUNK_SIZE],
            stats: IngestStats::default(),
            link_lost: false,
        }
    }

    /// Set the size of a single read
    pub fn with_read_buffer(mut self, size: usize) -> Self {
        self.buffer = vec![0; size.max(1)];
        self
    }

    /// Handle to the cache for the accessory side
    pub fn cache(&self) -> Arc<ReadingCache> {
        Arc::clone(&self.cache)
    }

    /// Latest cached reading
    pub fn current(&self) -> Reading {
        self.cache.load()
    }

    /// Read one chunk from the channel and ingest it
    ///
    /// Returns the number of bytes read. `Ok(0)` and errors both mark the
    /// link as lost; after that this method keeps returning `Ok(0)` without
    /// touching the channel.
    pub async fn poll_chunk(&mut self) -> Result<usize, ConnectorError> {
        if self.link_lost {
            return Ok(0);
        }

        let n = match self.channel.read(&mut self.buffer).await {
            Ok(n) => n,
            Err(e) => {
                self.link_lost = true;
                return Err(e);
            }
        };

        if n == 0 {
            self.link_lost = true;
            return Ok(0);
        }

        ingest_bytes(
            &mut self.decoder,
            &self.cache,
            &mut self.stats,
            &self.buffer[..n],
        );
        Ok(n)
    }

    /// Ingest bytes that did not come through `poll_chunk`
    ///
    /// Returns how many lines replaced the cached reading.
    pub fn ingest(&mut self, chunk: &[u8]) -> usize {
        ingest_bytes(&mut self.decoder, &self.cache, &mut self.stats, chunk)
    }

    /// Ingest one already framed line
    pub fn ingest_line(&mut self, line: &str) -> Result<Reading, ReadingError> {
        apply_reading(&self.cache, &mut self.stats, line, Reading::parse_line(line))
    }

    /// True once the channel reported EOF or an error
    pub fn is_link_lost(&self) -> bool {
        self.link_lost
    }

    /// Get ingestion statistics
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Get line framing statistics
    pub fn line_stats(&self) -> &LineStats {
        self.decoder.stats()
    }

    /// The owned channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The owned channel, for shutdown
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

/// Decode `chunk` and apply every completed line, returning accepted count
fn ingest_bytes(
    decoder: &mut LineDecoder<LINE_BUFFER_CAPACITY>,
    cache: &ReadingCache,
    stats: &mut IngestStats,
    chunk: &[u8],
) -> usize {
    let before = stats.readings_accepted;

    for line in decoder.feed(chunk) {
        if let Some(truncation) = line.truncation() {
            warn!("Serial line truncated ({}), kept {:?}", truncation, line.as_str());
        }

        // Rejections are already counted and logged
        let _ = apply_reading(cache, stats, &line, line.reading());
    }

    stats.readings_accepted - before
}

/// Store `parsed` if it is a reading, counting and logging either way
fn apply_reading(
    cache: &ReadingCache,
    stats: &mut IngestStats,
    line: &str,
    parsed: ReadingResult<Reading>,
) -> ReadingResult<Reading> {
    match parsed {
        Ok(reading) => {
            cache.store(reading);
            stats.readings_accepted += 1;
            debug!("temp={}", reading);
            Ok(reading)
        }
        Err(e) => {
            stats.parse_errors += 1;
            debug!("Ignoring line {:?}: {}; keeping {}", line, e, cache.load());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MemoryChannel;

    #[test]
    fn starts_at_zero() {
        let reader = SerialTemperatureReader::new(MemoryChannel::new("/dev/ttyACM0"));
        assert_eq!(reader.current().value(), 0.0);
    }

    #[test]
    fn ingest_counts_accepted_lines() {
        let mut reader = SerialTemperatureReader::new(MemoryChannel::new("mem"));

        assert_eq!(reader.ingest(b"21.3\n22.0\nbad\n19.9\n"), 3);
        assert_eq!(reader.current().value(), 19.9);
        assert_eq!(reader.stats().parse_errors, 1);
    }

    #[test]
    fn ingest_line_reports_rejection() {
        let mut reader = SerialTemperatureReader::new(MemoryChannel::new("mem"));
        reader.ingest_line("20.5").unwrap();

        assert_eq!(reader.ingest_line("oops"), Err(ReadingError::NotANumber));
        assert_eq!(reader.current().value(), 20.5);
    }

    #[test]
    fn overlong_line_keeps_terminated_prefix() {
        let mut reader = SerialTemperatureReader::new(MemoryChannel::new("mem"));
        let long = format!("21.5 {}\n", "x".repeat(LINE_BUFFER_CAPACITY));

        assert_eq!(reader.ingest(long.as_bytes()), 1);
        assert_eq!(reader.line_stats().lines_truncated, 1);
        assert_eq!(reader.current().value(), 21.5);
    }

    #[test]
    fn overlong_number_is_rejected() {
        let mut reader = SerialTemperatureReader::new(MemoryChannel::new("mem"));
        let long = format!("18.0\n{}\n", "9".repeat(LINE_BUFFER_CAPACITY + 1));

        assert_eq!(reader.ingest(long.as_bytes()), 1);
        assert_eq!(reader.stats().parse_errors, 1);
        assert_eq!(reader.line_stats().lines_truncated, 1);
        assert_eq!(reader.current().value(), 18.0);
    }

    #[test]
    fn non_ascii_suffix_keeps_reading() {
        let mut reader = SerialTemperatureReader::new(MemoryChannel::new("mem"));
        reader.ingest(b"20.0\n");

        assert_eq!(reader.ingest("23.5°C\n".as_bytes()), 1);
        assert_eq!(reader.current().value(), 23.5);
        assert_eq!(reader.line_stats().lines_truncated, 1);
    }

    #[tokio::test]
    async fn eof_marks_link_lost() {
        let channel = MemoryChannel::new("mem").with_chunk("23.5\n");
        let mut reader = SerialTemperatureReader::new(channel);

        assert_eq!(reader.poll_chunk().await.unwrap(), 5);
        assert!(!reader.is_link_lost());

        assert_eq!(reader.poll_chunk().await.unwrap(), 0);
        assert!(reader.is_link_lost());
        assert_eq!(reader.current().value(), 23.5);
    }

    #[tokio::test]
    async fn read_error_marks_link_lost() {
        let channel = MemoryChannel::new("mem").closed();
        let mut reader = SerialTemperatureReader::new(channel);

        assert!(reader.poll_chunk().await.is_err());
        assert!(reader.is_link_lost());
        assert_eq!(reader.poll_chunk().await.unwrap(), 0);
    }

    #[test]
    fn shares_external_cache() {
        let cache = Arc::new(ReadingCache::new());
        let mut reader = SerialTemperatureReader::with_cache(MemoryChannel::new("mem"), cache.clone());

        reader.ingest(b"17.25\n");
        assert_eq!(cache.load().value(), 17.25);
    }
}
