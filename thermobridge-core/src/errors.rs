//! Error types for rejected readings
//!
//! A decoded line can fail in three ways: it has no numeric prefix at all,
//! the prefix overflows into something that is not a finite number, or the
//! line was cut at the buffer capacity before the number visibly ended.
//! All are non-fatal. The bridge counts them and keeps the previous
//! reading.
//!
//! Errors are `Copy` and carry no heap data so they can be returned from the
//! decode loop on `no_std` targets.

use thiserror_no_std::Error;

/// Result type for reading operations
pub type ReadingResult<T> = Result<T, ReadingError>;

/// Why a line did not produce a reading
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingError {
    /// The line does not start with a number
    #[error("Line has no numeric prefix")]
    NotANumber,

    /// The numeric prefix is not finite (e.g. `1e999`)
    #[error("Invalid value: not a finite number")]
    InvalidValue,

    /// The line was cut inside its numeric prefix
    #[error("Line truncated inside its number")]
    Truncated,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadingError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotANumber => defmt::write!(fmt, "No numeric prefix"),
            Self::InvalidValue => defmt::write!(fmt, "Invalid value"),
            Self::Truncated => defmt::write!(fmt, "Truncated number"),
        }
    }
}
