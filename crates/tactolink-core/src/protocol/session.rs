//! Session management
//!
//! One [`Session`] owns the byte stream to a connected sensor and runs the
//! strictly alternating request/response exchanges: a second request is never
//! issued before the prior response has been read or timed out, since the
//! device would interleave the response bytes. Callers that need shared
//! access must serialize around the session; the protocol layer itself
//! assumes a single caller per connection.

use std::fmt;
use std::io::Write;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::channel::ByteStream;
use super::diag::{DiagSink, Event, TracingSink};
use super::frame::{Function, Request};
use super::reader::read_until;
use super::response::{parse_auto_push_response, parse_general_response, GeneralResponse};
use super::{
    ProtocolError, AUTO_PUSH_HEAD, AUTO_PUSH_REG, DEFAULT_COMMAND_TIMEOUT_MS,
    DEFAULT_SETTLE_DELAY_MS, GENERAL_RESPONSE_HEAD, VERSION_LEN, VERSION_REG,
};

/// Grace period after sending the fire-and-forget auto-push disable
const DISABLE_GRACE: Duration = Duration::from_millis(100);

/// Which acknowledgement a register write expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAck {
    /// A general (`AA 55`) response whose status payload must be all zeros
    General,
    /// An auto-push (`AA 56`) response whose error code must be zero
    AutoPush,
}

/// Session tuning knobs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for a command response
    pub command_timeout: Duration,
    /// Pause between writing a request and reading its response
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}

/// Device version, both printable and raw
///
/// The version register is nominally ASCII but devices pad it with
/// non-printable bytes, so the raw form is kept alongside the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Printable rendition of the version register
    pub text: String,
    /// Raw register bytes
    pub raw: Vec<u8>,
}

impl VersionInfo {
    /// Hex rendition of the raw bytes
    pub fn hex(&self) -> String {
        self.raw.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.hex())
    }
}

/// Connection to one sensor over an exclusively-owned byte stream
///
/// Lifecycle: construct around an open channel, run exchanges and/or one
/// streaming phase, then [`Session::close`]. Teardown always attempts the
/// auto-push disable first — a device left pushing to an absent listener
/// keeps saturating the link for whoever opens the port next — and releases
/// the channel whether or not that send went through. Dropping an unclosed
/// session performs the same best-effort teardown.
pub struct Session {
    channel: Option<Box<dyn ByteStream>>,
    config: SessionConfig,
    sink: Box<dyn DiagSink>,
    auto_push_armed: bool,
    tx_bytes: u64,
    rx_bytes: u64,
    tx_frames: u64,
    rx_frames: u64,
}

impl Session {
    /// Create a session over `channel` with diagnostics going to `tracing`.
    pub fn new(channel: Box<dyn ByteStream>, config: SessionConfig) -> Self {
        Self::with_sink(channel, config, Box::new(TracingSink))
    }

    /// Create a session with a custom diagnostics sink.
    pub fn with_sink(
        channel: Box<dyn ByteStream>,
        config: SessionConfig,
        sink: Box<dyn DiagSink>,
    ) -> Self {
        Self {
            channel: Some(channel),
            config,
            sink,
            auto_push_armed: false,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_frames: 0,
            rx_frames: 0,
        }
    }

    /// Cumulative `(tx_bytes, rx_bytes, tx_frames, rx_frames)`
    pub fn counters(&self) -> (u64, u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.tx_frames, self.rx_frames)
    }

    /// Whether auto-push was enabled and not yet disabled by this session
    pub fn auto_push_armed(&self) -> bool {
        self.auto_push_armed
    }

    /// Whether the channel is still held
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub(crate) fn stream_mut(&mut self) -> Result<&mut (dyn ByteStream + 'static), ProtocolError> {
        self.channel.as_deref_mut().ok_or(ProtocolError::Closed)
    }

    pub(crate) fn emit(&self, event: Event<'_>) {
        self.sink.event(event);
    }

    pub(crate) fn record_rx(&mut self, bytes: usize) {
        self.rx_bytes = self.rx_bytes.saturating_add(bytes as u64);
        self.rx_frames = self.rx_frames.saturating_add(1);
    }

    /// Write one encoded frame to the channel.
    fn send_frame(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.sink.event(Event::FrameSent { bytes });
        let channel = self.channel.as_deref_mut().ok_or(ProtocolError::Closed)?;
        channel.write_all(bytes)?;
        channel.flush()?;
        self.tx_bytes = self.tx_bytes.saturating_add(bytes.len() as u64);
        self.tx_frames = self.tx_frames.saturating_add(1);
        Ok(())
    }

    /// Run one request/response exchange and return the raw response bytes.
    fn exchange(&mut self, request: &Request, expected_head: [u8; 2]) -> Result<Vec<u8>, ProtocolError> {
        self.send_frame(&request.encode())?;
        thread::sleep(self.config.settle_delay);

        let timeout = self.config.command_timeout;
        let channel = self.channel.as_deref_mut().ok_or(ProtocolError::Closed)?;
        let response = match read_until(channel, timeout, Some(expected_head)) {
            Ok(bytes) => bytes,
            Err(ProtocolError::Timeout) => {
                return Err(ProtocolError::NoResponse {
                    reg_addr: request.reg_addr,
                })
            }
            Err(e) => return Err(e),
        };
        self.record_rx(response.len());
        self.sink.event(Event::FrameReceived { bytes: &response });
        Ok(response)
    }

    /// Decode a general response, routing suspect-frame events to the sink.
    fn decode_general(&self, bytes: &[u8]) -> Result<GeneralResponse, ProtocolError> {
        let parsed = match parse_general_response(bytes) {
            Ok(parsed) => parsed,
            Err(ProtocolError::DeviceError(code)) => {
                self.sink.event(Event::DeviceFault { code });
                return Err(ProtocolError::DeviceError(code));
            }
            Err(e) => return Err(e),
        };
        if parsed.truncated {
            self.sink.event(Event::Truncated {
                declared: parsed.data_len as usize,
                actual: parsed.data.len(),
            });
        }
        if !parsed.lrc_valid {
            self.sink.event(Event::LrcMismatch {
                calculated: parsed.lrc_calculated,
                received: parsed.lrc_received,
            });
        }
        Ok(parsed)
    }

    /// Read `len` bytes from `reg_addr` (function 0x03).
    ///
    /// Fails with [`ProtocolError::NoResponse`] on a silent device,
    /// [`ProtocolError::DeviceError`] when the device answers with an error
    /// code, and [`ProtocolError::ChecksumError`] when the response body does
    /// not verify.
    pub fn read_register(&mut self, reg_addr: u16, len: u16) -> Result<Vec<u8>, ProtocolError> {
        let request = Request::read(reg_addr, len)?;
        let response = self.exchange(&request, GENERAL_RESPONSE_HEAD)?;
        let parsed = self.decode_general(&response)?;

        if parsed.function != Function::Read {
            return Err(ProtocolError::FunctionMismatch {
                expected: Function::Read.code(),
                actual: parsed.function.code(),
            });
        }
        if !parsed.lrc_valid {
            return Err(ProtocolError::ChecksumError {
                calculated: parsed.lrc_calculated,
                received: parsed.lrc_received,
            });
        }
        Ok(parsed.data)
    }

    /// Write `payload` to `reg_addr` (function 0x10).
    ///
    /// `ack` selects which acknowledgement frame the device answers with:
    /// ordinary registers respond under the general head with a status
    /// payload (all zeros on success), the auto-push control register
    /// responds under the auto-push head with an error code. Any nonzero
    /// status is [`ProtocolError::WriteRejected`].
    pub fn write_register(
        &mut self,
        reg_addr: u16,
        payload: &[u8],
        ack: WriteAck,
    ) -> Result<(), ProtocolError> {
        let request = Request::write(reg_addr, payload)?;
        match ack {
            WriteAck::General => {
                let response = self.exchange(&request, GENERAL_RESPONSE_HEAD)?;
                let parsed = self.decode_general(&response)?;
                if parsed.function != Function::Write {
                    return Err(ProtocolError::FunctionMismatch {
                        expected: Function::Write.code(),
                        actual: parsed.function.code(),
                    });
                }
                if parsed.data.iter().any(|&b| b != 0) {
                    return Err(ProtocolError::WriteRejected(le_status(&parsed.data)));
                }
            }
            WriteAck::AutoPush => {
                let response = self.exchange(&request, AUTO_PUSH_HEAD)?;
                let parsed = parse_auto_push_response(&response)?;
                if !parsed.lrc_valid {
                    self.sink.event(Event::LrcMismatch {
                        calculated: parsed.lrc_calculated,
                        received: parsed.lrc_received,
                    });
                }
                if !parsed.is_ok() {
                    return Err(ProtocolError::WriteRejected(u64::from(parsed.error_code)));
                }
            }
        }
        Ok(())
    }

    /// Turn on unsolicited streaming (register 0x0017 := 1).
    ///
    /// Stale bytes are discarded first so a leftover frame tail cannot be
    /// mistaken for the acknowledgement.
    pub fn enable_auto_push(&mut self) -> Result<(), ProtocolError> {
        if let Ok(channel) = self.stream_mut() {
            channel.clear_input()?;
        }
        self.write_register(AUTO_PUSH_REG, &[0x01], WriteAck::AutoPush)?;
        self.auto_push_armed = true;
        Ok(())
    }

    /// Turn off unsolicited streaming (register 0x0017 := 0).
    ///
    /// Fire-and-forget: once the device is pushing, any acknowledgement would
    /// arrive interleaved with in-flight sample frames, so none is awaited.
    /// A short grace period lets the write drain before the caller closes
    /// the port.
    pub fn disable_auto_push(&mut self) -> Result<(), ProtocolError> {
        let request = Request::write(AUTO_PUSH_REG, &[0x00])?;
        self.send_frame(&request.encode())?;
        thread::sleep(DISABLE_GRACE);
        self.auto_push_armed = false;
        Ok(())
    }

    /// Read and decode the device version register.
    pub fn device_version(&mut self) -> Result<VersionInfo, ProtocolError> {
        let raw = self.read_register(VERSION_REG, VERSION_LEN)?;
        let text: String = raw
            .iter()
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| b as char)
            .collect();
        Ok(VersionInfo {
            text: text.trim().to_string(),
            raw,
        })
    }

    /// Tear the session down and release the channel.
    ///
    /// The auto-push disable is always attempted, regardless of whether it
    /// was this session that armed it or whether earlier exchanges failed.
    /// A failed disable is reported through the sink and returned, but the
    /// channel is released either way. Calling `close` twice is a no-op.
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        if self.channel.is_none() {
            return Ok(());
        }
        let result = self.disable_auto_push();
        if let Err(ref error) = result {
            self.sink.event(Event::TeardownFailed { error });
        }
        if let Some(channel) = self.channel.as_deref_mut() {
            let _ = channel.clear_input();
        }
        self.channel = None;
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Little-endian integer view of a status payload, for error reporting.
fn le_status(data: &[u8]) -> u64 {
    let mut status = 0u64;
    for (i, b) in data.iter().take(8).enumerate() {
        status |= u64::from(*b) << (8 * i);
    }
    status
}
