//! Stream Processing Traits
//!
//! Decoding follows a pull-based model using the `nb` crate: the consumer
//! asks for the next item and gets either an item, `WouldBlock` ("feed me
//! more bytes"), or an error. No async runtime is involved, so the same
//! decoder runs under tokio on the host and in a bare-metal main loop.
//!
//! ```rust
//! use thermobridge_core::traits::Stream;
//!
//! fn drain<S: Stream>(stream: &mut S, mut sink: impl FnMut(S::Item)) -> Result<(), S::Error> {
//!     loop {
//!         match stream.poll_next() {
//!             Ok(item) => sink(item),
//!             Err(nb::Error::WouldBlock) => return Ok(()),
//!             Err(nb::Error::Other(e)) => return Err(e),
//!         }
//!     }
//! }
//! ```

/// Core stream trait for decoded items
///
/// ## Error Handling
///
/// Streams use a two-level error model:
/// - `nb::Error::WouldBlock` - no complete item buffered yet
/// - `nb::Error::Other(E)` - an actual stream error
///
/// After an `Other` error the stream stays usable; the next call continues
/// with the following item.
pub trait Stream {
    /// Type of items produced by the stream
    type Item;

    /// Type of errors that can occur
    type Error;

    /// Attempt to pull the next item from the stream
    ///
    /// This method must not block.
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Returns bounds on remaining items
    ///
    /// Default implementation returns `(0, None)` indicating unknown size.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}
