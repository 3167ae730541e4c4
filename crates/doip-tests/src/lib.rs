//! Shared helpers for the integration tests
//!
//! Frame builders deliberately spell out the DoIP byte layout instead of
//! calling into `doip_transport::wire`, so the tests verify the wire format
//! independently of the code under test.

/// Build a raw frame: 8-byte generic header plus payload.
pub fn raw_frame(payload_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x02, 0xFD];
    frame.extend_from_slice(&payload_type.to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Build a vehicle-announcement frame for one diagnostic entity.
pub fn announcement_frame(vin: &[u8; 17], logical_address: u16, eid: [u8; 6], gid: [u8; 6]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(33);
    payload.extend_from_slice(vin);
    payload.extend_from_slice(&logical_address.to_be_bytes());
    payload.extend_from_slice(&eid);
    payload.extend_from_slice(&gid);
    payload.push(0x00); // further action required: none
    payload.push(0x00); // VIN/GID sync status
    raw_frame(0x0004, &payload)
}

/// Build a diagnostic-message frame (payload type 0x8001).
pub fn diagnostic_frame(source: u16, target: u16, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + data.len());
    payload.extend_from_slice(&source.to_be_bytes());
    payload.extend_from_slice(&target.to_be_bytes());
    payload.extend_from_slice(data);
    raw_frame(0x8001, &payload)
}
