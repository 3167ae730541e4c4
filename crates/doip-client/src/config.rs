//! Client configuration (TOML)

use doip_transport::{DiscoveryConfig, TcpChannelConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration of a diagnostic client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Conversation name, used in log output
    #[serde(default = "default_name")]
    pub name: String,
    /// UDP discovery channel settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// TCP stream channel settings for diagnostic sessions; absent when the
    /// client is discovery-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<TcpChannelConfig>,
    /// How long one discovery round collects responses
    #[serde(default = "default_collect_window_ms")]
    pub collect_window_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            discovery: DiscoveryConfig::default(),
            session: None,
            collect_window_ms: default_collect_window_ms(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

fn default_name() -> String {
    "vd-conversation".to_string()
}

fn default_collect_window_ms() -> u64 {
    2000
}
