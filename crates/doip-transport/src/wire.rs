//! DoIP wire header (ISO 13400 generic header)
//!
//! Every message, stream or datagram, starts with the same 8-byte preamble:
//!
//! ```text
//! byte 0      protocol version (0x02)
//! byte 1      inverse protocol version (0xFD)
//! bytes 2..4  payload type, u16 big-endian
//! bytes 4..8  payload length, u32 big-endian
//! ```
//!
//! The length field counts the bytes that follow the header.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the generic DoIP header.
pub const HEADER_LEN: usize = 8;

/// Byte offset of the big-endian payload length field within the header.
pub const PAYLOAD_LENGTH_OFFSET: usize = 4;

pub const PROTOCOL_VERSION: u8 = 0x02;
pub const INVERSE_PROTOCOL_VERSION: u8 = !PROTOCOL_VERSION;

/// Upper bound accepted for the payload length field. A peer-controlled
/// length drives a buffer allocation, so it must be capped before use.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// DoIP payload types used by this client.
pub mod payload_type {
    pub const VEHICLE_IDENTIFICATION_REQUEST: u16 = 0x0001;
    pub const VEHICLE_ANNOUNCEMENT: u16 = 0x0004;
    pub const DIAGNOSTIC_MESSAGE: u16 = 0x8001;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("protocol version mismatch (version {version:#04x}, inverse {inverse:#04x})")]
    VersionMismatch { version: u8, inverse: u8 },

    #[error("payload length {0} exceeds maximum of {MAX_PAYLOAD_LEN} bytes")]
    PayloadTooLarge(u32),
}

/// Parsed generic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub protocol_version: u8,
    pub payload_type: u16,
    pub payload_length: u32,
}

impl Header {
    pub fn new(payload_type: u16, payload_length: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload_type,
            payload_length,
        }
    }

    /// Parse a header, checking the inverse-version byte.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, WireError> {
        if bytes[0] != !bytes[1] {
            return Err(WireError::VersionMismatch {
                version: bytes[0],
                inverse: bytes[1],
            });
        }
        let payload_length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if payload_length as usize > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge(payload_length));
        }
        Ok(Self {
            protocol_version: bytes[0],
            payload_type: u16::from_be_bytes([bytes[2], bytes[3]]),
            payload_length,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = self.protocol_version;
        bytes[1] = !self.protocol_version;
        bytes[2..4].copy_from_slice(&self.payload_type.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes
    }
}

/// Build a complete frame: generic header followed by `payload`.
pub fn encode_frame(payload_type: u16, payload: &[u8]) -> Bytes {
    let header = Header::new(payload_type, payload.len() as u32);
    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_slice(&header.encode());
    frame.put_slice(payload);
    frame.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_encode_parse_round_trip() {
        let header = Header::new(payload_type::DIAGNOSTIC_MESSAGE, 0x0001_0203);
        let parsed = Header::parse(&header.encode()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn encode_frame_places_length_at_fixed_offset() {
        let frame = encode_frame(payload_type::VEHICLE_ANNOUNCEMENT, &[0xAA; 33]);
        assert_eq!(frame.len(), HEADER_LEN + 33);
        assert_eq!(&frame[..4], &[0x02, 0xFD, 0x00, 0x04]);
        assert_eq!(&frame[PAYLOAD_LENGTH_OFFSET..HEADER_LEN], &[0, 0, 0, 33]);
    }

    #[test]
    fn vir_frame_has_empty_payload() {
        let frame = encode_frame(payload_type::VEHICLE_IDENTIFICATION_REQUEST, &[]);
        assert_eq!(&frame[..], &[0x02, 0xFD, 0x00, 0x01, 0, 0, 0, 0]);
    }

    #[test]
    fn bad_inverse_version_is_rejected() {
        let mut bytes = Header::new(payload_type::DIAGNOSTIC_MESSAGE, 0).encode();
        bytes[1] = 0x00;
        assert!(matches!(
            Header::parse(&bytes),
            Err(WireError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut bytes = Header::new(payload_type::DIAGNOSTIC_MESSAGE, 0).encode();
        bytes[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Header::parse(&bytes),
            Err(WireError::PayloadTooLarge(_))
        ));
    }
}
