//! Transport abstraction
//!
//! The protocol core is written against a narrow byte-stream trait instead of
//! a concrete serial port, so exchanges can run over any duplex channel and
//! the tests can script a fake device on the other end.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// A duplex byte channel to the sensor
pub trait ByteStream: Read + Write + Send {
    /// Number of bytes ready to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard any unread inbound bytes
    fn clear_input(&mut self) -> io::Result<()>;

    /// Discard any unsent outbound bytes
    fn clear_output(&mut self) -> io::Result<()>;
}

/// Serial port adapter implementing [`ByteStream`]
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an already-open serial port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl ByteStream for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Output)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
