//! Serial Protocol Constants
//!
//! Fixed parameters of the link between the bridge and the microcontroller.
//! The device sketch prints one reading per line with `Serial.println`, so
//! these values have to match the firmware, not the host.

// ===== LINK PARAMETERS =====

/// Baud rate the microcontroller firmware is flashed with.
///
/// No autobaud and no handshake: a mismatch shows up as garbage lines,
/// which the parser rejects without touching the cached reading.
pub const SERIAL_BAUD_RATE: u32 = 9600;

// ===== FRAMING =====

/// Line delimiter emitted by the firmware.
pub const LINE_DELIMITER: u8 = b'\n';

/// Carriage return stripped from `\r\n` terminated lines.
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Capacity of the line buffer in bytes.
///
/// A reading such as `-12.375` is under ten characters. 64 bytes leaves
/// room for a unit suffix or a short debug message from the sketch; a
/// longer line is cut at the capacity and only its start is kept.
pub const LINE_BUFFER_CAPACITY: usize = 64;

/// Size of a single serial read on the host side.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

// ===== READING =====

/// Value reported before the first line has been accepted.
pub const INITIAL_READING: f32 = 0.0;
