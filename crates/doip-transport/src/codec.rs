//! Byte-range decoding helpers
//!
//! Used to lift fixed-offset fields (VIN, EID, GID) out of discovery
//! payloads. All range arithmetic is checked; a bad range is reported to the
//! caller instead of panicking.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("byte range (start {start}, count {count}) exceeds buffer length {len}")]
    OutOfRange {
        start: usize,
        count: usize,
        len: usize,
    },
}

fn checked_range(buffer: &[u8], start: usize, count: usize) -> Result<&[u8], CodecError> {
    let end = start
        .checked_add(count)
        .filter(|&end| end <= buffer.len())
        .ok_or(CodecError::OutOfRange {
            start,
            count,
            len: buffer.len(),
        })?;
    Ok(&buffer[start..end])
}

/// Render `count` bytes from `start` as two-digit lowercase hex, colon-joined.
///
/// `[0x00, 0x1a, 0xff]` becomes `"00:1a:ff"`.
pub fn decode_hex(buffer: &[u8], start: usize, count: usize) -> Result<String, CodecError> {
    let bytes = checked_range(buffer, start, count)?;
    Ok(bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Render `count` bytes from `start` verbatim as characters.
///
/// No printability validation is performed; VIN bytes are expected to be
/// plain ASCII but the wire does not guarantee it.
pub fn decode_ascii(buffer: &[u8], start: usize, count: usize) -> Result<String, CodecError> {
    let bytes = checked_range(buffer, start, count)?;
    Ok(bytes.iter().map(|&byte| byte as char).collect())
}
