//! Byte-stream accumulation
//!
//! The transport delivers bytes with no framing and no push notification, so
//! inbound frames are gathered by polling: read whatever is pending, reset
//! the deadline whenever something arrives, and give up once a full timeout
//! passes in silence. When the caller knows which frame head it is waiting
//! for, the read returns as soon as the marker shows up with any leading
//! bytes stripped, which is how the exchange layer resynchronizes past stray
//! bytes or a previous frame's tail.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::channel::ByteStream;
use super::ProtocolError;

/// Poll interval while the line is silent
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Extra wait after a fragment arrives, for follow-up bytes still in flight
const FRAGMENT_WAIT: Duration = Duration::from_millis(5);

/// Accumulate bytes from `channel` until `timeout` passes with nothing new.
///
/// The timeout is sliding: each arrival pushes the deadline out, so a frame
/// that keeps trickling in is never cut off mid-read. With `expected_head`
/// set, the call returns early the moment the marker appears in the
/// accumulated buffer, discarding everything before it. Returns
/// [`ProtocolError::Timeout`] only when nothing at all arrived.
pub fn read_until(
    channel: &mut dyn ByteStream,
    timeout: Duration,
    expected_head: Option<[u8; 2]>,
) -> Result<Vec<u8>, ProtocolError> {
    read_until_cancelable(channel, timeout, expected_head, None)
}

/// Like [`read_until`], checking `cancel` at every poll tick.
///
/// Cancellation is cooperative: the loop never blocks on the transport
/// primitive itself, so raising the flag takes effect within one tick. A
/// cancelled read with an empty buffer reports [`ProtocolError::Timeout`].
pub fn read_until_cancelable(
    channel: &mut dyn ByteStream,
    timeout: Duration,
    expected_head: Option<[u8; 2]>,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<u8>, ProtocolError> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 512];
    let mut deadline = Instant::now() + timeout;

    loop {
        if Instant::now() >= deadline {
            break;
        }
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                break;
            }
        }

        let available = channel.bytes_to_read()? as usize;
        if available > 0 {
            let to_read = available.min(chunk.len());
            let n = match channel.read(&mut chunk[..to_read]) {
                Ok(n) => n,
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    0
                }
                Err(e) => return Err(e.into()),
            };
            if n > 0 {
                received.extend_from_slice(&chunk[..n]);
                if let Some(head) = expected_head {
                    if let Some(pos) = find_marker(&received, head) {
                        received.drain(..pos);
                        return Ok(received);
                    }
                }
                deadline = Instant::now() + timeout;
                std::thread::sleep(FRAGMENT_WAIT);
                continue;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    if received.is_empty() {
        Err(ProtocolError::Timeout)
    } else {
        Ok(received)
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|window| window == marker)
}
