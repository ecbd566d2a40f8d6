//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the sensor
///
/// Transport failures (`Timeout`, `NoResponse`, `Io`, `Serial`) are
/// retryable; construction errors (`InvalidLength`) are caller bugs and fail
/// fast. Checksum and truncation problems on otherwise decodable frames are
/// carried as flags on the parsed records instead, so only the exchange layer
/// promotes them to hard errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("serial port error: {0}")]
    Serial(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no bytes received within the deadline")]
    Timeout,

    #[error("no response to request for register {reg_addr:#06x}")]
    NoResponse {
        /// Register the unanswered request targeted
        reg_addr: u16,
    },

    #[error("frame head mismatch: expected {expected:02x?}, got {actual:02x?}")]
    BadHead {
        /// Head the caller was decoding for
        expected: [u8; 2],
        /// Head actually present in the buffer
        actual: [u8; 2],
    },

    #[error("frame too short: {len} bytes, need at least {min}")]
    FrameTooShort {
        /// Bytes available
        len: usize,
        /// Minimum frame size for this variant
        min: usize,
    },

    #[error("LRC mismatch: calculated {calculated:#04x}, received {received:#04x}")]
    ChecksumError {
        /// LRC computed over the received frame body
        calculated: u8,
        /// Trailing checksum byte the sensor sent
        received: u8,
    },

    #[error("device reported error code {0:#04x}")]
    DeviceError(u8),

    #[error("write rejected with status {0:#x}")]
    WriteRejected(u64),

    #[error("unknown function code {0:#04x}")]
    UnknownFunction(u8),

    #[error("response function {actual:#04x} does not match request {expected:#04x}")]
    FunctionMismatch {
        /// Function code the request carried
        expected: u8,
        /// Function code the response carried
        actual: u8,
    },

    #[error("invalid length {len} (allowed {min}-{max})")]
    InvalidLength {
        /// Length the caller asked for
        len: usize,
        /// Smallest allowed value
        min: usize,
        /// Largest allowed value
        max: usize,
    },

    #[error("session is closed")]
    Closed,
}
