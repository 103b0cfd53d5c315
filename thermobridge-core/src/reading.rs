//! Temperature reading and line parsing
//!
//! A reading is whatever number the firmware printed. The unit is not part
//! of the protocol, so nothing here converts or range-checks it. The one
//! guarantee a `Reading` gives is that it is finite: NaN and infinities
//! cannot be constructed, which keeps them out of the cache by type.
//!
//! ## Parsing
//!
//! Lines are parsed by their leading numeric prefix, so trailing text is
//! tolerated:
//!
//! | Line        | Result          |
//! |-------------|-----------------|
//! | `23.5`      | 23.5            |
//! | `23.5 C`    | 23.5            |
//! | `  -4.25`   | -4.25           |
//! | `1e2x`      | 100.0           |
//! | `7e`        | 7.0             |
//! | `bad`       | `NotANumber`    |
//! | `1e999`     | `InvalidValue`  |

use core::fmt;

use crate::constants::INITIAL_READING;
use crate::errors::{ReadingError, ReadingResult};

/// A single finite temperature value
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Reading(f32);

impl Reading {
    /// Wrap a value, rejecting NaN and infinities
    pub fn new(value: f32) -> ReadingResult<Self> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(ReadingError::InvalidValue)
        }
    }

    /// Parse a decoded line by its leading numeric prefix
    pub fn parse_line(line: &str) -> ReadingResult<Self> {
        let value = parse_leading_float(line).ok_or(ReadingError::NotANumber)?;
        Self::new(value)
    }

    /// Parse a line that was cut at the line buffer capacity
    ///
    /// The prefix is only trusted when the kept text shows where the number
    /// ends, i.e. some byte after it cannot belong to a number. Otherwise
    /// the digits may continue past the cut and the line is rejected as
    /// `Truncated`.
    pub fn parse_truncated(line: &str) -> ReadingResult<Self> {
        let line = line.trim_start();
        let prefix = numeric_prefix(line).ok_or(ReadingError::NotANumber)?;

        let terminated = line[prefix.len()..].bytes().any(|b| !is_number_byte(b));
        if !terminated {
            return Err(ReadingError::Truncated);
        }

        Self::parse_line(prefix)
    }

    /// The raw value in device units
    pub fn value(self) -> f32 {
        self.0
    }

    /// Bit pattern used by the atomic cache
    pub(crate) fn to_bits(self) -> u32 {
        self.0.to_bits()
    }

    /// Only ever called on bits produced by `to_bits`
    pub(crate) fn from_bits(bits: u32) -> Self {
        Self(f32::from_bits(bits))
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self(INITIAL_READING)
    }
}

impl From<Reading> for f32 {
    fn from(reading: Reading) -> Self {
        reading.0
    }
}

impl TryFrom<f32> for Reading {
    type Error = ReadingError;

    fn try_from(value: f32) -> ReadingResult<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Parse the longest numeric prefix of `text`
///
/// Leading whitespace is skipped. The prefix is an optional sign, digits
/// with an optional fractional part (at least one digit overall) and an
/// optional exponent. An exponent without digits is left out of the prefix
/// rather than failing the parse. Returns `None` when there is no prefix.
///
/// The result may be infinite for huge exponents; `Reading::new` rejects it.
pub fn parse_leading_float(text: &str) -> Option<f32> {
    numeric_prefix(text)?.parse::<f32>().ok()
}

/// The numeric prefix itself, after leading whitespace
fn numeric_prefix(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    // The prefix is ASCII by construction, so slicing is on a char boundary
    Some(&text[..end])
}

fn is_number_byte(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
