//! Channel configuration
//!
//! All addresses are IPv4. Defaults follow ISO 13400: port 13400 for both
//! discovery and diagnostic sessions, limited broadcast for discovery.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// UDP discovery channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Local bind address
    #[serde(default = "default_any_ip")]
    pub local_ip: IpAddr,
    /// Local bind port (0 = ephemeral)
    #[serde(default)]
    pub local_port: u16,
    /// Broadcast destination for vehicle identification requests
    #[serde(default = "default_broadcast_ip")]
    pub broadcast_ip: IpAddr,
    /// Broadcast destination port (default: 13400)
    #[serde(default = "default_doip_port")]
    pub broadcast_port: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            local_ip: default_any_ip(),
            local_port: 0,
            broadcast_ip: default_broadcast_ip(),
            broadcast_port: default_doip_port(),
        }
    }
}

/// TCP stream channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpChannelConfig {
    /// Local bind address
    #[serde(default = "default_any_ip")]
    pub local_ip: IpAddr,
    /// Local bind port (0 = ephemeral)
    #[serde(default)]
    pub local_port: u16,
    /// Remote DoIP entity address
    pub remote_ip: IpAddr,
    /// Remote DoIP entity port (default: 13400)
    #[serde(default = "default_doip_port")]
    pub remote_port: u16,
}

fn default_any_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_broadcast_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

fn default_doip_port() -> u16 {
    13400
}
