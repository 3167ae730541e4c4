//! doip-client - vehicle discovery conversation over the DoIP transport
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         DiagClient                           │
//! │                                                              │
//! │  ┌────────────────┐     register      ┌───────────────────┐  │
//! │  │ VdConversation │◄──────────────────│ UdpTransportHandler│ │
//! │  │ (correlation   │  handle_message   │ (facade over      │  │
//! │  │  store, drain) │◄──────────────────│  UdpDiscovery-    │  │
//! │  │                │───transmit───────►│  Channel)         │  │
//! │  └────────────────┘                   └───────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conversation turns a fire-and-collect broadcast exchange into a
//! request/response call: transmit, wait the caller-supplied window, drain
//! whatever the receiver task accumulated.

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handler;
pub mod testing;
pub mod vehicle_info;

pub use client::DiagClient;
pub use config::ClientConfig;
pub use conversation::{DiscoveryTransport, VdConversation};
pub use error::DiscoveryError;
pub use handler::{TcpTransportHandler, UdpTransportHandler};
pub use vehicle_info::{VehicleIdentityRecord, VehicleListRequest};

// Re-export for convenience
pub use doip_transport::{ReadHandler, TransportError, UdsMessage, VehicleIdentificationMessage};
