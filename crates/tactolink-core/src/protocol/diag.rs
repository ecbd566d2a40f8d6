//! Diagnostics events
//!
//! Parsing and I/O report noteworthy conditions through an injected sink
//! rather than a process-global logger, so the host decides where
//! observability goes: [`TracingSink`] forwards everything to `tracing`,
//! [`NopSink`] discards, and tests collect events for assertions.

use super::ProtocolError;

/// Why the streaming loop dropped a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The buffer never yielded a decodable frame
    Malformed,
    /// The frame was shorter than its declared length
    Truncated,
    /// The checksum did not verify
    ChecksumFailed,
}

/// A diagnostic event emitted by the protocol layer
#[derive(Debug)]
pub enum Event<'a> {
    /// A request frame was written to the transport
    FrameSent {
        /// The encoded frame
        bytes: &'a [u8],
    },
    /// A candidate frame was read from the transport
    FrameReceived {
        /// The raw buffer as accumulated
        bytes: &'a [u8],
    },
    /// A frame decoded but its checksum did not match
    LrcMismatch {
        /// LRC computed over the frame body
        calculated: u8,
        /// Checksum byte the sensor sent
        received: u8,
    },
    /// A frame declared more data than was present
    Truncated {
        /// Declared data length
        declared: usize,
        /// Bytes actually present
        actual: usize,
    },
    /// The device reported an error code in place of a response body
    DeviceFault {
        /// The low seven bits of the error function code
        code: u8,
    },
    /// A streamed sample was dropped
    SampleSkipped {
        /// What disqualified the frame
        reason: SkipReason,
    },
    /// The auto-push disable could not be delivered during teardown
    TeardownFailed {
        /// The send failure
        error: &'a ProtocolError,
    },
}

/// Receiver for protocol diagnostics
pub trait DiagSink: Send {
    /// Handle one event.
    fn event(&self, event: Event<'_>);
}

/// Sink that forwards events to `tracing`
///
/// Frame traffic goes out at debug level, everything suspect at warn.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagSink for TracingSink {
    fn event(&self, event: Event<'_>) {
        match event {
            Event::FrameSent { bytes } => {
                tracing::debug!("frame sent ({} bytes): {:02x?}", bytes.len(), bytes);
            }
            Event::FrameReceived { bytes } => {
                tracing::debug!("frame received ({} bytes): {:02x?}", bytes.len(), bytes);
            }
            Event::LrcMismatch {
                calculated,
                received,
            } => {
                tracing::warn!(
                    "LRC mismatch: calculated {calculated:#04x}, received {received:#04x}"
                );
            }
            Event::Truncated { declared, actual } => {
                tracing::warn!("truncated frame: declared {declared} bytes, got {actual}");
            }
            Event::DeviceFault { code } => {
                tracing::warn!("device reported error code {code:#04x}");
            }
            Event::SampleSkipped { reason } => {
                tracing::warn!("streamed sample skipped: {reason:?}");
            }
            Event::TeardownFailed { error } => {
                tracing::warn!("auto-push disable failed during teardown: {error}");
            }
        }
    }
}

/// Sink that discards every event
#[derive(Debug, Default)]
pub struct NopSink;

impl DiagSink for NopSink {
    fn event(&self, _event: Event<'_>) {}
}
