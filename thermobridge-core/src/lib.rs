//! Core reading model for thermobridge
//!
//! Turns the raw byte stream coming off a temperature microcontroller into
//! a single cached reading. Nothing here touches a serial port or a runtime,
//! so the same code runs on the host bridge and on `no_std` targets.
//!
//! Key constraints:
//! - One line per reading, newline delimited, ASCII
//! - Fixed-capacity line buffer, no heap allocation while decoding
//! - The cached value is never replaced by something that is not a number
//!
//! ```
//! use thermobridge_core::{LineDecoder, ReadingCache};
//!
//! let cache = ReadingCache::new();
//! let mut decoder: LineDecoder<64> = LineDecoder::new();
//!
//! for line in decoder.feed("21.3\nbad\n22.5°C\n".as_bytes()) {
//!     if let Ok(reading) = line.reading() {
//!         cache.store(reading);
//!     }
//! }
//!
//! assert_eq!(cache.load().value(), 22.5);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod constants;
pub mod errors;
pub mod reading;
pub mod stream;
pub mod traits;

// Public API
pub use cache::ReadingCache;
pub use errors::{ReadingError, ReadingResult};
pub use reading::{parse_leading_float, Reading};
pub use stream::{Line, LineDecoder, LineStats, Lines, Truncation};
pub use traits::Stream;

/// Crate version, reported by the bridge at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
