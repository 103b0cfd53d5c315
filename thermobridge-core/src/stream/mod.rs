//! Stream processing for the serial byte stream
//!
//! - Truncation reasons (this file)
//! - `lines` - newline framing over arbitrary chunk boundaries

use core::fmt;

pub mod lines;

pub use lines::{Line, LineDecoder, LineStats, Lines};

/// Why a decoded line holds only the start of what the device sent
///
/// Framing never fails: a line that cannot be kept whole is cut, and the
/// kept prefix is still handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// A non-ASCII byte ended the kept text
    NonAscii,
    /// The line did not fit in the line buffer
    Overflow,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonAscii => write!(f, "non-ASCII byte"),
            Self::Overflow => write!(f, "line buffer full"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Truncation {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NonAscii => defmt::write!(fmt, "non-ASCII byte"),
            Self::Overflow => defmt::write!(fmt, "line buffer full"),
        }
    }
}

// Re-export traits for convenience
pub use crate::traits::Stream;
