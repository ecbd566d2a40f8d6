//! # TactoLink Core Library
//!
//! Core protocol implementation for GEN3-class multi-axis tactile sensors.
//!
//! The sensors speak a compact binary request/response protocol over a
//! high-speed serial link, plus an unsolicited "auto-push" streaming mode in
//! which the device emits sample frames on its own once armed. This crate
//! implements that protocol: frame construction, checksum handling, byte
//! accumulation over the unreliable link, frame decoding, the register
//! read/write exchange, and the streaming loop.
//!
//! Payload semantics (force/position/contact arrays) are deliberately left to
//! downstream consumers: this layer hands out decoded register payloads as
//! raw byte buffers plus validity flags.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tactolink_core::protocol::{serial, Session, SessionConfig, StopCondition};
//!
//! let channel = serial::open_channel("/dev/ttyUSB0", None)?;
//! let mut session = Session::new(Box::new(channel), SessionConfig::default());
//!
//! println!("version: {}", session.device_version()?);
//!
//! session.enable_auto_push()?;
//! session.monitor(StopCondition::after(Duration::from_secs(5)), None, |sample| {
//!     println!("{} bytes", sample.frame.data.len());
//! })?;
//! session.close()?;
//! ```

#![warn(missing_docs)]

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        AutoPushData, AutoPushResponse, GeneralResponse, MonitorStats, ProtocolError, Sample,
        Session, SessionConfig, StopCondition, VersionInfo, WriteAck,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
