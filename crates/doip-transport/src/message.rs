//! Message value types crossing the transport boundary
//!
//! Messages are owned buffers plus addressing metadata. They move across the
//! boundary: `transmit` consumes them, indication callbacks receive them by
//! value.

use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::wire::{self, payload_type, Header, HEADER_LEN};

/// Addressing mode of a diagnostic message target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetAddressKind {
    /// Addressed to a single diagnostic entity.
    #[default]
    Physical,
    /// Addressed to a functional group of entities.
    Functional,
}

/// Protocol family a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolKind {
    #[default]
    Doip,
}

/// An addressed diagnostic message with an opaque payload.
///
/// Interpretation of the payload is service-layer business; this type only
/// carries the transport envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdsMessage {
    pub source_address: u16,
    pub target_address: u16,
    pub target_kind: TargetAddressKind,
    pub channel_id: u32,
    pub priority: u8,
    pub protocol: ProtocolKind,
    /// Network address of the remote peer. Set on reception; `None` until a
    /// request has been given to a connected channel.
    pub peer: Option<SocketAddr>,
    pub payload: Vec<u8>,
}

impl UdsMessage {
    /// Build an outbound request towards `target_address`.
    pub fn request(source_address: u16, target_address: u16, payload: Vec<u8>) -> Self {
        Self {
            source_address,
            target_address,
            target_kind: TargetAddressKind::Physical,
            channel_id: 0,
            priority: 0,
            protocol: ProtocolKind::Doip,
            peer: None,
            payload,
        }
    }

    /// Build an inbound message observed from `peer`.
    pub fn reception(peer: SocketAddr, payload: Vec<u8>) -> Self {
        Self {
            source_address: 0,
            target_address: 0,
            target_kind: TargetAddressKind::Physical,
            channel_id: 0,
            priority: 0,
            protocol: ProtocolKind::Doip,
            peer: Some(peer),
            payload,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    pub fn resize_payload(&mut self, len: usize) {
        self.payload.resize(len, 0);
    }

    /// Serialize as a DoIP diagnostic message frame:
    /// generic header, source address, target address, payload.
    pub fn to_wire(&self) -> Bytes {
        let mut body = BytesMut::with_capacity(4 + self.payload.len());
        body.put_u16(self.source_address);
        body.put_u16(self.target_address);
        body.put_slice(&self.payload);
        wire::encode_frame(payload_type::DIAGNOSTIC_MESSAGE, &body)
    }

    /// Build a message from a fully assembled frame received from `peer`.
    ///
    /// Diagnostic-message frames have their address words lifted into the
    /// envelope; for any other payload type the addresses stay zero and the
    /// payload is passed through untouched.
    pub fn from_frame(peer: SocketAddr, header: Header, frame: &[u8]) -> Self {
        let body = &frame[HEADER_LEN..];
        if header.payload_type == payload_type::DIAGNOSTIC_MESSAGE && body.len() >= 4 {
            let mut message = Self::reception(peer, body[4..].to_vec());
            message.source_address = u16::from_be_bytes([body[0], body[1]]);
            message.target_address = u16::from_be_bytes([body[2], body[3]]);
            message
        } else {
            Self::reception(peer, body.to_vec())
        }
    }
}

/// Inbound vehicle-announcement datagram: sender address plus the raw
/// identification payload, decoded by the conversation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentificationMessage {
    pub peer: SocketAddr,
    pub payload: Vec<u8>,
}

impl VehicleIdentificationMessage {
    pub fn reception(peer: SocketAddr, payload: Vec<u8>) -> Self {
        Self { peer, payload }
    }
}

/// Outbound vehicle-identification request. Serializes as a zero-payload
/// frame; carries no fields today.
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleIdentificationRequest;

impl VehicleIdentificationRequest {
    pub fn to_wire(&self) -> Bytes {
        wire::encode_frame(payload_type::VEHICLE_IDENTIFICATION_REQUEST, &[])
    }
}
