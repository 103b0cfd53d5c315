//! Serial channels
//!
//! Two implementations of `SerialChannel`:
//!
//! - `SerialConnector` owns a real port opened through tokio-serial. It is
//!   registered with the tokio reactor, so reads never block the bridge task.
//! - `MemoryChannel` replays a fixed list of chunks. It is used in tests and
//!   for dry runs without hardware, and can be told to fail or hang on close.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::config::SerialConfig;
use crate::{ConnectionStats, ConnectorError, SerialChannel};

/// Serial port connector backed by tokio-serial
pub struct SerialConnector {
    config: SerialConfig,
    port: Option<SerialStream>,
    stats: ConnectionStats,
}

impl SerialConnector {
    /// Open the port described by `config`
    ///
    /// Must be called from inside a tokio runtime. Fails immediately if the
    /// device does not exist or cannot be opened; there is no retry.
    pub fn open(config: SerialConfig) -> Result<Self, ConnectorError> {
        let port = tokio_serial::new(config.path.as_str(), config.baud_rate)
            .open_native_async()
            .map_err(|source| ConnectorError::Open {
                path: config.path.clone(),
                source,
            })?;

        info!("Opened serial port {} at {} baud", config.path, config.baud_rate);

        Ok(Self {
            config,
            port: Some(port),
            stats: ConnectionStats::default(),
        })
    }
}

#[async_trait::async_trait]
impl SerialChannel for SerialConnector {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConnectorError> {
        let port = self.port.as_mut().ok_or(ConnectorError::NotConnected)?;

        match port.read(buf).await {
            Ok(n) => {
                if n > 0 {
                    self.stats.bytes_received += n as u64;
                    self.stats.chunks_received += 1;
                }
                Ok(n)
            }
            Err(e) => {
                self.stats.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        let mut port = self.port.take().ok_or(ConnectorError::NotConnected)?;

        // Flush anything queued for the device; the descriptor is released
        // when `port` drops, whatever the flush result
        let result = port.shutdown().await;
        drop(port);

        debug!("Released serial port {}", self.config.path);
        result.map_err(|e| {
            self.stats.last_error = Some(e.to_string());
            ConnectorError::Io(e)
        })
    }

    fn path(&self) -> &str {
        &self.config.path
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}

#[derive(Debug, Clone)]
enum CloseBehavior {
    Succeed,
    Fail(String),
    Hang,
}

/// In-memory channel that replays recorded chunks
///
/// ## Example
///
/// ```rust
/// use thermobridge_connectors::{MemoryChannel, SerialChannel};
///
/// # async fn example() {
/// let mut channel = MemoryChannel::new("/dev/ttyACM0")
///     .with_chunk("23.")
///     .with_chunk("5\n");
///
/// let mut buf = [0u8; 16];
/// assert_eq!(channel.read(&mut buf).await.unwrap(), 3);
/// assert_eq!(channel.read(&mut buf).await.unwrap(), 2);
/// assert_eq!(channel.read(&mut buf).await.unwrap(), 0); // link gone
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryChannel {
    path: String,
    chunks: VecDeque<Vec<u8>>,
    open: bool,
    idle_when_drained: bool,
    close_behavior: CloseBehavior,
    close_count: Arc<AtomicUsize>,
    stats: ConnectionStats,
}

impl MemoryChannel {
    /// Create an open channel with nothing to read
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            chunks: VecDeque::new(),
            open: true,
            idle_when_drained: false,
            close_behavior: CloseBehavior::Succeed,
            close_count: Arc::new(AtomicUsize::new(0)),
            stats: ConnectionStats::default(),
        }
    }

    /// Queue a chunk to be returned by a later read
    pub fn with_chunk(mut self, chunk: impl Into<Vec<u8>>) -> Self {
        self.chunks.push_back(chunk.into());
        self
    }

    /// Queue several chunks
    pub fn with_chunks<I, C>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.chunks.extend(chunks.into_iter().map(Into::into));
        self
    }

    /// Keep reads pending once the chunks run out instead of reporting EOF
    pub fn idle_when_drained(mut self) -> Self {
        self.idle_when_drained = true;
        self
    }

    /// Make `close` report an I/O error
    pub fn failing_close(mut self, message: impl Into<String>) -> Self {
        self.close_behavior = CloseBehavior::Fail(message.into());
        self
    }

    /// Make `close` never complete
    pub fn hanging_close(mut self) -> Self {
        self.close_behavior = CloseBehavior::Hang;
        self
    }

    /// Start in the closed state
    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    /// Number of `close` calls so far
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Shared close counter, readable after the channel has been moved
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_count)
    }
}

#[async_trait::async_trait]
impl SerialChannel for MemoryChannel {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConnectorError> {
        if !self.open {
            return Err(ConnectorError::NotConnected);
        }

        let Some(mut chunk) = self.chunks.pop_front() else {
            if self.idle_when_drained {
                std::future::pending::<()>().await;
            }
            return Ok(0);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }

        if n > 0 {
            self.stats.bytes_received += n as u64;
            self.stats.chunks_received += 1;
        }
        Ok(n)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        if !self.open {
            return Err(ConnectorError::NotConnected);
        }

        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.open = false;

        match &self.close_behavior {
            CloseBehavior::Succeed => Ok(()),
            CloseBehavior::Fail(message) => {
                self.stats.last_error = Some(message.clone());
                Err(ConnectorError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    message.clone(),
                )))
            }
            CloseBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
