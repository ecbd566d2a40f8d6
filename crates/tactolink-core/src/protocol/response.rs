//! Inbound frame decoding
//!
//! Three decoders, one per frame variant: general responses (`AA 55`),
//! auto-push control responses and auto-push data frames (both `AA 56`,
//! distinguished only by context). All three are pure — no I/O, no clock.
//!
//! The link is noisy, so checksum failures and short frames do not reject an
//! otherwise decodable frame: they are carried as `lrc_valid`/`truncated`
//! flags on the record and the caller decides whether to salvage or discard.
//! Structural problems (wrong head, too short to carry the header, a device
//! error code in place of the function) do fail, since there is nothing
//! usable to return.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::frame::Function;
use super::lrc::lrc;
use super::{ProtocolError, AUTO_PUSH_HEAD, GENERAL_RESPONSE_HEAD};

/// Minimum byte count for a general response (header fields only)
const GENERAL_MIN_LEN: usize = 8;

/// Minimum byte count for an auto-push frame (head through LRC, no data)
const AUTO_PUSH_MIN_LEN: usize = 7;

/// Offset of the data field in a general response
const GENERAL_DATA_OFFSET: usize = 8;

/// Offset of the valid-data field in an auto-push frame
const AUTO_PUSH_DATA_OFFSET: usize = 6;

/// A decoded general (`AA 55`) response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralResponse {
    /// Echoed function code
    pub function: Function,
    /// Echoed register address
    pub reg_addr: u16,
    /// Declared payload length
    pub data_len: u16,
    /// Payload bytes (possibly short, see `truncated`)
    pub data: Vec<u8>,
    /// The buffer held fewer payload bytes than `data_len` declared
    pub truncated: bool,
    /// The trailing checksum byte matched the computed LRC
    pub lrc_valid: bool,
    /// LRC computed over the frame body
    pub lrc_calculated: u8,
    /// Checksum byte the sensor sent
    pub lrc_received: u8,
}

/// A decoded auto-push (`AA 56`) control response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoPushResponse {
    /// Declared valid-frame length (data length + 1)
    pub valid_frame_len: u16,
    /// Device status: zero means the control write was accepted
    pub error_code: u8,
    /// Valid-data bytes (possibly short, see `truncated`)
    pub data: Vec<u8>,
    /// The buffer held fewer data bytes than declared
    pub truncated: bool,
    /// The trailing checksum byte matched the computed LRC
    pub lrc_valid: bool,
    /// LRC computed over the frame body
    pub lrc_calculated: u8,
    /// Checksum byte the sensor sent
    pub lrc_received: u8,
}

impl AutoPushResponse {
    /// Whether the device accepted the control write
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

/// A decoded auto-push (`AA 56`) streamed data frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoPushData {
    /// Declared valid-frame length (data length + 1)
    pub valid_frame_len: u16,
    /// Per-frame device error code, zero when the sample is clean
    pub error_code: u8,
    /// Sample bytes (possibly short, see `truncated`)
    pub data: Vec<u8>,
    /// The buffer held fewer data bytes than declared
    pub truncated: bool,
    /// `Some(false)` when the caller supplied an expected data length and the
    /// declared length disagrees; `None` when no expectation was given
    pub length_match: Option<bool>,
    /// The trailing checksum byte matched the computed LRC
    pub lrc_valid: bool,
    /// LRC computed over the frame body
    pub lrc_calculated: u8,
    /// Checksum byte the sensor sent
    pub lrc_received: u8,
}

/// Shared decode result for the data/checksum tail of a frame.
struct Tail {
    data: Vec<u8>,
    truncated: bool,
    lrc_valid: bool,
    lrc_calculated: u8,
    lrc_received: u8,
}

/// Extract `declared_len` data bytes at `data_offset` and verify the LRC.
///
/// When the buffer holds the whole frame, verification uses the declared
/// checksum position so trailing bytes of a following frame cannot poison the
/// check. A short buffer yields whatever data is present (final byte reserved
/// as the presumed checksum), flagged truncated with `lrc_valid` false.
fn decode_tail(bytes: &[u8], data_offset: usize, declared_len: usize) -> Tail {
    let checksum_offset = data_offset + declared_len;
    if bytes.len() > checksum_offset {
        let lrc_calculated = lrc(&bytes[..checksum_offset]);
        let lrc_received = bytes[checksum_offset];
        Tail {
            data: bytes[data_offset..checksum_offset].to_vec(),
            truncated: false,
            lrc_valid: lrc_calculated == lrc_received,
            lrc_calculated,
            lrc_received,
        }
    } else {
        let end = (bytes.len() - 1).max(data_offset);
        Tail {
            data: bytes[data_offset..end].to_vec(),
            truncated: true,
            lrc_valid: false,
            lrc_calculated: lrc(&bytes[..bytes.len() - 1]),
            lrc_received: bytes[bytes.len() - 1],
        }
    }
}

/// Decode a general response frame.
///
/// A response whose function code has the top bit set is a device error
/// report; decoding stops there with [`ProtocolError::DeviceError`] carrying
/// the low seven bits, and no payload is extracted.
pub fn parse_general_response(bytes: &[u8]) -> Result<GeneralResponse, ProtocolError> {
    if bytes.len() < GENERAL_MIN_LEN {
        return Err(ProtocolError::FrameTooShort {
            len: bytes.len(),
            min: GENERAL_MIN_LEN,
        });
    }
    if bytes[..2] != GENERAL_RESPONSE_HEAD {
        return Err(ProtocolError::BadHead {
            expected: GENERAL_RESPONSE_HEAD,
            actual: [bytes[0], bytes[1]],
        });
    }

    let function_code = bytes[3];
    if function_code & 0x80 != 0 {
        // The body of an error response is not trustworthy beyond the code.
        return Err(ProtocolError::DeviceError(function_code & 0x7F));
    }
    let function =
        Function::from_code(function_code).ok_or(ProtocolError::UnknownFunction(function_code))?;

    let reg_addr = LittleEndian::read_u16(&bytes[4..6]);
    let data_len = LittleEndian::read_u16(&bytes[6..8]);
    let tail = decode_tail(bytes, GENERAL_DATA_OFFSET, data_len as usize);

    Ok(GeneralResponse {
        function,
        reg_addr,
        data_len,
        data: tail.data,
        truncated: tail.truncated,
        lrc_valid: tail.lrc_valid,
        lrc_calculated: tail.lrc_calculated,
        lrc_received: tail.lrc_received,
    })
}

/// Header + tail decode shared by both auto-push variants.
fn parse_auto_push(bytes: &[u8]) -> Result<(u16, u8, Tail), ProtocolError> {
    if bytes.len() < AUTO_PUSH_MIN_LEN {
        return Err(ProtocolError::FrameTooShort {
            len: bytes.len(),
            min: AUTO_PUSH_MIN_LEN,
        });
    }
    if bytes[..2] != AUTO_PUSH_HEAD {
        return Err(ProtocolError::BadHead {
            expected: AUTO_PUSH_HEAD,
            actual: [bytes[0], bytes[1]],
        });
    }

    let valid_frame_len = LittleEndian::read_u16(&bytes[3..5]);
    let error_code = bytes[5];
    // valid_frame_len counts the error-code byte along with the data.
    let data_len = (valid_frame_len as usize).saturating_sub(1);
    let tail = decode_tail(bytes, AUTO_PUSH_DATA_OFFSET, data_len);
    Ok((valid_frame_len, error_code, tail))
}

/// Decode the acknowledgement to an auto-push control write.
pub fn parse_auto_push_response(bytes: &[u8]) -> Result<AutoPushResponse, ProtocolError> {
    let (valid_frame_len, error_code, tail) = parse_auto_push(bytes)?;
    Ok(AutoPushResponse {
        valid_frame_len,
        error_code,
        data: tail.data,
        truncated: tail.truncated,
        lrc_valid: tail.lrc_valid,
        lrc_calculated: tail.lrc_calculated,
        lrc_received: tail.lrc_received,
    })
}

/// Decode a streamed auto-push data frame.
///
/// `expected_len` is the data length the host configured the sensor to push;
/// when given, a disagreement sets `length_match` to `Some(false)` without
/// failing the decode.
pub fn parse_auto_push_data(
    bytes: &[u8],
    expected_len: Option<usize>,
) -> Result<AutoPushData, ProtocolError> {
    let (valid_frame_len, error_code, tail) = parse_auto_push(bytes)?;
    let declared_len = (valid_frame_len as usize).saturating_sub(1);
    Ok(AutoPushData {
        valid_frame_len,
        error_code,
        data: tail.data,
        truncated: tail.truncated,
        length_match: expected_len.map(|want| declared_len == want),
        lrc_valid: tail.lrc_valid,
        lrc_calculated: tail.lrc_calculated,
        lrc_received: tail.lrc_received,
    })
}
