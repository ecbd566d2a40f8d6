//! Longitudinal redundancy check
//!
//! Every frame ends in one LRC byte: the two's complement of the wrapping
//! 8-bit sum of all preceding bytes. Builder and parser must agree
//! byte-for-byte, so both call through here.

/// Compute the LRC over `bytes`.
pub fn lrc(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}
