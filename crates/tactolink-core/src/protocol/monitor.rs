//! Auto-push streaming
//!
//! Once the device is armed it emits sample frames on its own schedule. The
//! monitor loop owns the session's stream for its whole run: short reads
//! against the `AA 56` head, one decoded sample per clean frame handed to the
//! caller. The physical link drops bytes under load, so malformed or suspect
//! frames are counted and skipped, never fatal; only the stop condition or a
//! transport error ends the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diag::{Event, SkipReason};
use super::reader::read_until_cancelable;
use super::response::{parse_auto_push_data, AutoPushData};
use super::session::Session;
use super::{ProtocolError, AUTO_PUSH_HEAD, DEFAULT_PUSH_TIMEOUT_MS};

/// When a streaming loop should give up
///
/// The default runs until cancelled externally or the stream errors.
#[derive(Debug, Clone, Default)]
pub struct StopCondition {
    /// Stop once this much wall-clock time has elapsed
    pub deadline: Option<Duration>,
    /// Stop when this flag is raised
    pub cancel: Option<Arc<AtomicBool>>,
}

impl StopCondition {
    /// Run for at most `deadline`.
    pub fn after(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Run until `flag` is raised from elsewhere.
    pub fn cancelled_by(flag: Arc<AtomicBool>) -> Self {
        Self {
            deadline: None,
            cancel: Some(flag),
        }
    }

    fn done(&self, started: Instant) -> bool {
        if let Some(deadline) = self.deadline {
            if started.elapsed() >= deadline {
                return true;
            }
        }
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        false
    }
}

/// One decoded auto-push sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Capture timestamp
    pub received_at: DateTime<Utc>,
    /// The decoded frame
    pub frame: AutoPushData,
}

/// Summary of a finished streaming run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorStats {
    /// Samples handed to the callback
    pub delivered: u64,
    /// Frames dropped as malformed or suspect
    pub skipped: u64,
    /// Wall-clock run time
    pub elapsed: Duration,
}

impl Session {
    /// Stream auto-push samples into `on_sample` until `stop` signals.
    ///
    /// `expected_len` is the configured sample payload size, if known; each
    /// frame's `length_match` flag is set against it. The stream belongs to
    /// the loop for its whole duration — register reads and writes must wait
    /// until it returns, and auto-push should be disabled before issuing
    /// them, since the device cannot tell the two traffic classes apart.
    pub fn monitor<F>(
        &mut self,
        stop: StopCondition,
        expected_len: Option<usize>,
        mut on_sample: F,
    ) -> Result<MonitorStats, ProtocolError>
    where
        F: FnMut(Sample),
    {
        let started = Instant::now();
        let timeout = Duration::from_millis(DEFAULT_PUSH_TIMEOUT_MS);
        let mut stats = MonitorStats::default();

        while !stop.done(started) {
            let cancel = stop.cancel.as_deref();
            let channel = self.stream_mut()?;
            let bytes = match read_until_cancelable(channel, timeout, Some(AUTO_PUSH_HEAD), cancel)
            {
                Ok(bytes) => bytes,
                // Nothing pushed within this tick; keep listening.
                Err(ProtocolError::Timeout) => continue,
                // Transport failures are not survivable mid-stream.
                Err(e) => return Err(e),
            };
            self.record_rx(bytes.len());
            self.emit(Event::FrameReceived { bytes: &bytes });

            match parse_auto_push_data(&bytes, expected_len) {
                Ok(frame) if frame.truncated => {
                    stats.skipped += 1;
                    self.emit(Event::SampleSkipped {
                        reason: SkipReason::Truncated,
                    });
                }
                Ok(frame) if !frame.lrc_valid => {
                    stats.skipped += 1;
                    self.emit(Event::SampleSkipped {
                        reason: SkipReason::ChecksumFailed,
                    });
                }
                Ok(frame) => {
                    stats.delivered += 1;
                    on_sample(Sample {
                        received_at: Utc::now(),
                        frame,
                    });
                }
                Err(_) => {
                    stats.skipped += 1;
                    self.emit(Event::SampleSkipped {
                        reason: SkipReason::Malformed,
                    });
                }
            }
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::protocol::testutil::{encode_auto_push, CollectSink, SharedChannel};
    use crate::protocol::SessionConfig;

    fn streaming_session(channel: &SharedChannel) -> (Session, CollectSink) {
        let sink = CollectSink::default();
        let session = Session::with_sink(
            Box::new(channel.clone()),
            SessionConfig::default(),
            Box::new(sink.clone()),
        );
        (session, sink)
    }

    #[test]
    fn corrupt_frame_is_skipped_and_the_stream_survives() {
        let good_a = encode_auto_push(0x00, &[0x01, 0x02, 0x03, 0x04]);
        let mut corrupt = encode_auto_push(0x00, &[0x05, 0x06, 0x07, 0x08]);
        corrupt.truncate(corrupt.len() - 4);
        let good_b = encode_auto_push(0x00, &[0x09, 0x0A, 0x0B, 0x0C]);

        let channel = SharedChannel::new(vec![
            (Duration::from_millis(0), good_a),
            (Duration::from_millis(70), corrupt),
            (Duration::from_millis(140), good_b),
        ]);
        let (mut session, sink) = streaming_session(&channel);

        let mut seen = Vec::new();
        let stats = session
            .monitor(
                StopCondition::after(Duration::from_millis(300)),
                Some(4),
                |sample| seen.push(sample.frame.data.clone()),
            )
            .unwrap();

        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            seen,
            vec![vec![0x01, 0x02, 0x03, 0x04], vec![0x09, 0x0A, 0x0B, 0x0C]]
        );
        assert_eq!(sink.count("sample_skipped"), 1);
    }

    #[test]
    fn garbage_between_frames_is_resynchronized_away() {
        let mut chunk = vec![0xDE, 0xAD];
        chunk.extend_from_slice(&encode_auto_push(0x00, &[0x11, 0x22]));
        let channel = SharedChannel::new(vec![(Duration::from_millis(0), chunk)]);
        let (mut session, _sink) = streaming_session(&channel);

        let mut delivered = 0u32;
        let stats = session
            .monitor(
                StopCondition::after(Duration::from_millis(150)),
                None,
                |_sample| delivered += 1,
            )
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn deadline_alone_stops_an_idle_stream() {
        let channel = SharedChannel::new(Vec::new());
        let (mut session, _sink) = streaming_session(&channel);

        let started = Instant::now();
        let stats = session
            .monitor(StopCondition::after(Duration::from_millis(80)), None, |_| {
                panic!("no samples expected")
            })
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(stats.delivered, 0);
        assert!(elapsed >= Duration::from_millis(80));
        assert!(elapsed < Duration::from_millis(800));
    }

    #[test]
    fn cancellation_flag_stops_the_stream() {
        let channel = SharedChannel::new(Vec::new());
        let (mut session, _sink) = streaming_session(&channel);

        let flag = Arc::new(AtomicBool::new(true));
        let stats = session
            .monitor(StopCondition::cancelled_by(flag), None, |_| {
                panic!("no samples expected")
            })
            .unwrap();
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn device_fault_samples_are_still_delivered() {
        // A nonzero per-frame error code is data, not a protocol failure;
        // the caller sees it on the record.
        let faulty = encode_auto_push(0x07, &[0x00, 0x00]);
        let channel = SharedChannel::new(vec![(Duration::from_millis(0), faulty)]);
        let (mut session, _sink) = streaming_session(&channel);

        let mut codes = Vec::new();
        session
            .monitor(
                StopCondition::after(Duration::from_millis(120)),
                Some(2),
                |sample| codes.push(sample.frame.error_code),
            )
            .unwrap();
        assert_eq!(codes, vec![0x07]);
    }

    #[test]
    fn samples_serialize_for_downstream_consumers() {
        let frame = parse_auto_push_data(&encode_auto_push(0x00, &[0x01, 0x02]), Some(2)).unwrap();
        let sample = Sample {
            received_at: Utc::now(),
            frame,
        };
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
