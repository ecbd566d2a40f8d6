//! Test doubles shared by the protocol test modules.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::channel::ByteStream;
use super::diag::{DiagSink, Event};
use super::lrc::lrc;

/// Encode a well-formed general response frame for test fixtures.
pub fn encode_general_response(function: u8, reg_addr: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xAA, 0x55, 0x00, function];
    bytes.extend_from_slice(&reg_addr.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u16).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes.push(lrc(&bytes));
    bytes
}

/// Encode a well-formed auto-push frame (ack or data) for test fixtures.
pub fn encode_auto_push(error_code: u8, data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xAA, 0x56, 0x00];
    bytes.extend_from_slice(&(data.len() as u16 + 1).to_le_bytes());
    bytes.push(error_code);
    bytes.extend_from_slice(data);
    bytes.push(lrc(&bytes));
    bytes
}

/// Byte-stream double that releases scripted inbound chunks on a wall-clock
/// schedule (offsets from construction) and records everything written.
pub struct ScriptedChannel {
    started: Instant,
    script: VecDeque<(Duration, Vec<u8>)>,
    pending: Vec<u8>,
    /// Everything the code under test wrote to the channel
    pub written: Vec<u8>,
}

impl ScriptedChannel {
    /// Create a channel that will release `script` chunks as they come due.
    pub fn new(script: Vec<(Duration, Vec<u8>)>) -> Self {
        Self {
            started: Instant::now(),
            script: script.into(),
            pending: Vec::new(),
            written: Vec::new(),
        }
    }

    /// A channel that never produces a byte.
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    fn release_due(&mut self) {
        let elapsed = self.started.elapsed();
        while matches!(self.script.front(), Some((at, _)) if *at <= elapsed) {
            let (_, chunk) = self.script.pop_front().expect("front checked above");
            self.pending.extend_from_slice(&chunk);
        }
    }
}

impl Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.release_due();
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for ScriptedChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.release_due();
        Ok(self.pending.len() as u32)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        // Only already-released bytes are stale; future chunks stay queued.
        self.pending.clear();
        Ok(())
    }

    fn clear_output(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable handle around a [`ScriptedChannel`] so a test can keep
/// inspecting it after handing the session its own copy.
#[derive(Clone)]
pub struct SharedChannel(Arc<Mutex<ScriptedChannel>>);

impl SharedChannel {
    /// Create a shared scripted channel.
    pub fn new(script: Vec<(Duration, Vec<u8>)>) -> Self {
        Self(Arc::new(Mutex::new(ScriptedChannel::new(script))))
    }

    /// Snapshot of everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().written.clone()
    }
}

impl Read for SharedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock().unwrap().read(buf)
    }
}

impl Write for SharedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl ByteStream for SharedChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.0.lock().unwrap().bytes_to_read()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().clear_input()
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().clear_output()
    }
}

/// Sink that records event names for assertions.
#[derive(Clone, Default)]
pub struct CollectSink(Arc<Mutex<Vec<&'static str>>>);

impl CollectSink {
    /// Names of the events seen so far, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    /// How many events named `name` were seen.
    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }
}

impl DiagSink for CollectSink {
    fn event(&self, event: Event<'_>) {
        let name = match event {
            Event::FrameSent { .. } => "frame_sent",
            Event::FrameReceived { .. } => "frame_received",
            Event::LrcMismatch { .. } => "lrc_mismatch",
            Event::Truncated { .. } => "truncated",
            Event::DeviceFault { .. } => "device_fault",
            Event::SampleSkipped { .. } => "sample_skipped",
            Event::TeardownFailed { .. } => "teardown_failed",
        };
        self.0.lock().unwrap().push(name);
    }
}
