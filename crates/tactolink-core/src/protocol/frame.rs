//! Request frame construction
//!
//! Outbound frames share one shape: head + reserved byte + function code +
//! register address + data length + payload, terminated by the LRC byte.
//! Register address and length are little-endian. For reads the payload is
//! empty and the data-length field carries the requested byte count instead.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::lrc::lrc;
use super::{ProtocolError, MAX_READ_LEN, MAX_WRITE_LEN, REQUEST_HEAD, RESERVED};

/// Register access function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Function {
    /// Read one or more bytes from a register
    Read = 0x03,
    /// Write up to ten bytes to a register
    Write = 0x10,
}

impl Function {
    /// Wire value of the function code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a wire byte back to a function code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x03 => Some(Function::Read),
            0x10 => Some(Function::Write),
            _ => None,
        }
    }
}

/// An outbound request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Function code
    pub function: Function,
    /// Target register address
    pub reg_addr: u16,
    /// Requested byte count for reads, payload length for writes
    pub data_len: u16,
    /// Write payload (empty for reads)
    pub payload: Vec<u8>,
}

impl Request {
    /// Build a read request for `len` bytes from `reg_addr`.
    ///
    /// `len` must be within 1–512; out-of-bounds values are a caller bug and
    /// fail with [`ProtocolError::InvalidLength`] rather than being clamped.
    pub fn read(reg_addr: u16, len: u16) -> Result<Self, ProtocolError> {
        if len == 0 || len > MAX_READ_LEN {
            return Err(ProtocolError::InvalidLength {
                len: len as usize,
                min: 1,
                max: MAX_READ_LEN as usize,
            });
        }
        Ok(Self {
            function: Function::Read,
            reg_addr,
            data_len: len,
            payload: Vec::new(),
        })
    }

    /// Build a write request carrying `payload` to `reg_addr`.
    ///
    /// The payload must be 1–10 bytes.
    pub fn write(reg_addr: u16, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() || payload.len() > MAX_WRITE_LEN {
            return Err(ProtocolError::InvalidLength {
                len: payload.len(),
                min: 1,
                max: MAX_WRITE_LEN,
            });
        }
        Ok(Self {
            function: Function::Write,
            reg_addr,
            data_len: payload.len() as u16,
            payload: payload.to_vec(),
        })
    }

    /// Encode the frame, appending the LRC byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.payload.len() + 1);
        bytes.extend_from_slice(&REQUEST_HEAD);
        bytes.push(RESERVED);
        bytes.push(self.function.code());
        let mut field = [0u8; 2];
        LittleEndian::write_u16(&mut field, self.reg_addr);
        bytes.extend_from_slice(&field);
        LittleEndian::write_u16(&mut field, self.data_len);
        bytes.extend_from_slice(&field);
        bytes.extend_from_slice(&self.payload);
        bytes.push(lrc(&bytes));
        bytes
    }

    /// Total encoded size including the checksum byte
    pub fn encoded_size(&self) -> usize {
        8 + self.payload.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::protocol::{AUTO_PUSH_REG, VERSION_LEN, VERSION_REG};

    #[test]
    fn enable_auto_push_reference_vector() {
        // Documented command: write 01 to register 0x0017.
        let frame = Request::write(AUTO_PUSH_REG, &[0x01]).unwrap();
        assert_eq!(
            frame.encode(),
            vec![0x55, 0xAA, 0x00, 0x10, 0x17, 0x00, 0x01, 0x00, 0x01, 0xD8]
        );
    }

    #[test]
    fn read_version_reference_vector() {
        // Documented command: read 15 bytes from register 0x0000.
        let frame = Request::read(VERSION_REG, VERSION_LEN).unwrap();
        assert_eq!(
            frame.encode(),
            vec![0x55, 0xAA, 0x00, 0x03, 0x00, 0x00, 0x0F, 0x00, 0xEF]
        );
    }

    #[test]
    fn read_length_bounds() {
        assert!(Request::read(0x0010, 1).is_ok());
        assert!(Request::read(0x0010, 512).is_ok());
        assert!(matches!(
            Request::read(0x0010, 0),
            Err(ProtocolError::InvalidLength { len: 0, .. })
        ));
        assert!(matches!(
            Request::read(0x0010, 513),
            Err(ProtocolError::InvalidLength { len: 513, .. })
        ));
    }

    #[test]
    fn write_payload_bounds() {
        assert!(Request::write(0x0010, &[0x01]).is_ok());
        assert!(Request::write(0x0010, &[0u8; 10]).is_ok());
        assert!(matches!(
            Request::write(0x0010, &[]),
            Err(ProtocolError::InvalidLength { len: 0, .. })
        ));
        assert!(matches!(
            Request::write(0x0010, &[0u8; 11]),
            Err(ProtocolError::InvalidLength { len: 11, .. })
        ));
    }

    #[test]
    fn encoded_frames_are_checksum_valid() {
        let frame = Request::write(0x1234, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let bytes = frame.encode();
        assert_eq!(bytes.len(), frame.encoded_size());
        let (body, check) = bytes.split_at(bytes.len() - 1);
        assert_eq!(lrc(body), check[0]);
    }

    #[test]
    fn function_code_round_trip() {
        assert_eq!(Function::from_code(0x03), Some(Function::Read));
        assert_eq!(Function::from_code(0x10), Some(Function::Write));
        assert_eq!(Function::from_code(0x04), None);
        assert_eq!(Function::Read.code(), 0x03);
        assert_eq!(Function::Write.code(), 0x10);
    }
}
