//! Serial port handling
//!
//! Opens and configures a port for sensor communication. Port discovery and
//! selection are left to the caller; this module only turns a port name into
//! a ready [`SerialChannel`].

use serialport::SerialPort;
use std::time::Duration;

use super::channel::SerialChannel;
use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Open a serial port at the sensor's bit rate.
///
/// Uses a short read timeout so the polling reader never blocks long on the
/// transport primitive, and a write timeout so a stalled line cannot hang a
/// partial frame write indefinitely.
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    serialport::new(name, baud)
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| ProtocolError::Serial(e.to_string()))
}

/// Configure a serial port for sensor communication: 8N1, no flow control.
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::Serial(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::Serial(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::Serial(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::Serial(e.to_string()))?;
    Ok(())
}

/// Open and configure a port in one call, returning a ready channel.
pub fn open_channel(name: &str, baud_rate: Option<u32>) -> Result<SerialChannel, ProtocolError> {
    let mut port = open_port(name, baud_rate)?;
    configure_port(port.as_mut())?;
    Ok(SerialChannel::new(port))
}
