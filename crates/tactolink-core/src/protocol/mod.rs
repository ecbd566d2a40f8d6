//! Sensor Serial Protocol
//!
//! Implements the GEN3 tactile sensor binary protocol: request/response
//! register access and the unsolicited auto-push streaming mode.
//!
//! Every frame is a head-tagged byte sequence terminated by a single LRC
//! byte; all multi-byte fields are little-endian. Three frame classes exist,
//! told apart by their two-byte head: requests (`55 AA`), general responses
//! (`AA 55`), and auto-push traffic (`AA 56`, covering both the enable
//! acknowledgement and the streamed data frames).

pub mod channel;
pub mod diag;
mod error;
mod frame;
mod lrc;
mod monitor;
mod reader;
mod response;
pub mod serial;
mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use channel::{ByteStream, SerialChannel};
pub use diag::{DiagSink, Event, NopSink, SkipReason, TracingSink};
pub use error::ProtocolError;
pub use frame::{Function, Request};
pub use lrc::lrc;
pub use monitor::{MonitorStats, Sample, StopCondition};
pub use reader::{read_until, read_until_cancelable};
pub use response::{
    parse_auto_push_data, parse_auto_push_response, parse_general_response, AutoPushData,
    AutoPushResponse, GeneralResponse,
};
pub use session::{Session, SessionConfig, VersionInfo, WriteAck};

/// Request frame head (host → sensor)
pub const REQUEST_HEAD: [u8; 2] = [0x55, 0xAA];

/// General response frame head (sensor → host)
pub const GENERAL_RESPONSE_HEAD: [u8; 2] = [0xAA, 0x55];

/// Auto-push frame head (sensor → host, both control acks and streamed data)
pub const AUTO_PUSH_HEAD: [u8; 2] = [0xAA, 0x56];

/// Reserved byte following the head in every frame
pub const RESERVED: u8 = 0x00;

/// Auto-push control register (write 1 to enable, 0 to disable)
pub const AUTO_PUSH_REG: u16 = 0x0017;

/// Version string register
pub const VERSION_REG: u16 = 0x0000;

/// Length of the version register in bytes
pub const VERSION_LEN: u16 = 15;

/// Data-type combination register, selects the streamed sample layout
pub const DATA_TYPE_REG: u16 = 0x0016;

/// Default baud rate for the high-speed communication board
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Default deadline for a command response in milliseconds
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1_000;

/// Default per-poll deadline while listening for pushed frames
pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 50;

/// Default pause between sending a request and reading its response
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;

/// Largest register block a single read may request, in bytes
pub const MAX_READ_LEN: u16 = 512;

/// Largest write payload in bytes
pub const MAX_WRITE_LEN: usize = 10;
