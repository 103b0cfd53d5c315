//! Latest-value cache shared between the reader and the accessory host
//!
//! The cache holds exactly one `Reading`. It is written by the serial reader
//! and read by whoever answers "current temperature" queries, possibly from
//! another thread. The value is stored as its `f32` bit pattern in an
//! `AtomicU32`, so a read always observes a complete earlier write and no
//! lock is needed.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::reading::Reading;

/// Single-slot, last-write-wins reading cache
#[derive(Debug)]
pub struct ReadingCache {
    bits: AtomicU32,
}

impl ReadingCache {
    /// Create a cache holding the initial reading (0.0)
    pub fn new() -> Self {
        Self::with_reading(Reading::default())
    }

    /// Create a cache pre-seeded with a reading
    pub fn with_reading(reading: Reading) -> Self {
        Self {
            bits: AtomicU32::new(reading.to_bits()),
        }
    }

    /// Latest stored reading
    pub fn load(&self) -> Reading {
        Reading::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Overwrite the stored reading
    pub fn store(&self, reading: Reading) {
        self.bits.store(reading.to_bits(), Ordering::Release);
    }
}

impl Default for ReadingCache {
    fn default() -> Self {
        Self::new()
    }
}
