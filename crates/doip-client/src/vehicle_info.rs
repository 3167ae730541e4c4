//! Vehicle identity records and their fixed-layout payload decoding
//!
//! Announcement payload layout (byte offsets, protocol-fixed):
//!
//! ```text
//! [0, 17)   VIN, ASCII
//! [17, 19)  logical address, u16 big-endian
//! [19, 25)  entity identifier (EID), 6 raw bytes
//! [25, 31)  group identifier (GID), 6 raw bytes
//! ```

use std::net::IpAddr;

use doip_transport::codec::{decode_ascii, decode_hex, CodecError};

const VIN_OFFSET: usize = 0;
const VIN_LEN: usize = 17;
const LOGICAL_ADDRESS_OFFSET: usize = 17;
const EID_OFFSET: usize = 19;
const GID_OFFSET: usize = 25;
const ID_LEN: usize = 6;

/// Minimum announcement payload carrying all identity fields.
pub const MIN_PAYLOAD_LEN: usize = GID_OFFSET + ID_LEN;

/// Decoded discovery response for one diagnostic entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentityRecord {
    /// Peer network address the announcement arrived from.
    pub ip_address: String,
    /// 16-bit logical address; unique per vehicle on the segment and used as
    /// the correlation key.
    pub logical_address: u16,
    /// 17 ASCII characters.
    pub vin: String,
    /// Entity identifier, colon-hex (e.g. `00:1a:2b:3c:4d:5e`).
    pub eid: String,
    /// Group identifier, colon-hex.
    pub gid: String,
}

impl VehicleIdentityRecord {
    /// Decode an announcement payload received from `peer`.
    ///
    /// Payloads shorter than [`MIN_PAYLOAD_LEN`] are rejected; bytes past the
    /// identity fields (further-action, sync status) are ignored.
    pub fn decode(peer: IpAddr, payload: &[u8]) -> Result<(u16, Self), CodecError> {
        if payload.len() < MIN_PAYLOAD_LEN {
            return Err(CodecError::OutOfRange {
                start: 0,
                count: MIN_PAYLOAD_LEN,
                len: payload.len(),
            });
        }

        let vin = decode_ascii(payload, VIN_OFFSET, VIN_LEN)?;
        let logical_address = u16::from_be_bytes([
            payload[LOGICAL_ADDRESS_OFFSET],
            payload[LOGICAL_ADDRESS_OFFSET + 1],
        ]);
        let eid = decode_hex(payload, EID_OFFSET, ID_LEN)?;
        let gid = decode_hex(payload, GID_OFFSET, ID_LEN)?;

        let record = Self {
            ip_address: peer.to_string(),
            logical_address,
            vin,
            eid,
            gid,
        };
        Ok((logical_address, record))
    }
}

/// Parameters of a vehicle identification round.
///
/// Empty today; exists as the validation extension point for future
/// constraints (VIN/EID-filtered identification requests).
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleListRequest;
