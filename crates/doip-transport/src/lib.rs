//! doip-transport - DoIP transport channels and wire framing
//!
//! This crate owns the socket-level side of the diagnostic client:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     doip-transport                        │
//! │                                                           │
//! │  ┌──────────────┐                  ┌───────────────────┐  │
//! │  │ TcpChannel   │                  │UdpDiscoveryChannel│  │
//! │  │ (diag.       │                  │ (broadcast VIR,   │  │
//! │  │  sessions)   │                  │  collect VAM)     │  │
//! │  └──────┬───────┘                  └────────┬──────────┘  │
//! │         │                                   │             │
//! │     ┌───┴───────────────────────────────────┴───┐         │
//! │     │          wire (8-byte DoIP header)        │         │
//! │     └───────────────────────────────────────────┘         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each channel owns one socket and one background receiver task. Fully
//! assembled messages are handed to a registered callback on the receiver
//! task; no correlation happens at this layer.

pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod tcp;
pub mod udp;
pub mod wire;

pub use codec::CodecError;
pub use config::{DiscoveryConfig, TcpChannelConfig};
pub use error::TransportError;
pub use message::{
    ProtocolKind, TargetAddressKind, UdsMessage, VehicleIdentificationMessage,
    VehicleIdentificationRequest,
};
pub use tcp::{ChannelState, ReadHandler, TcpChannel};
pub use udp::{IndicationHandler, UdpDiscoveryChannel};
