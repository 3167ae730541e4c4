//! Transport handler facades
//!
//! Thin adapters binding channel-level callbacks to conversation methods and
//! passing lifecycle calls through. They exist so channel construction and
//! ownership stay out of the conversation logic.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use doip_transport::{
    DiscoveryConfig, ReadHandler, TcpChannel, TcpChannelConfig, TransportError,
    UdpDiscoveryChannel, UdsMessage, VehicleIdentificationRequest,
};

use crate::conversation::{DiscoveryTransport, VdConversation};

/// Facade over the UDP discovery channel. Inbound announcements are routed
/// to `VdConversation::handle_message`; everything else is pass-through.
pub struct UdpTransportHandler {
    channel: UdpDiscoveryChannel,
}

impl UdpTransportHandler {
    pub fn new(config: DiscoveryConfig, conversation: Arc<VdConversation>) -> Self {
        let channel = UdpDiscoveryChannel::new(
            config,
            Arc::new(move |message| conversation.handle_message(message)),
        );
        Self { channel }
    }
}

#[async_trait]
impl DiscoveryTransport for UdpTransportHandler {
    async fn initialize(&self) -> Result<(), TransportError> {
        self.channel.initialize().await
    }

    fn start(&self) -> Result<(), TransportError> {
        self.channel.start()
    }

    async fn stop(&self) {
        self.channel.stop().await;
    }

    async fn transmit(
        &self,
        request: &VehicleIdentificationRequest,
    ) -> Result<(), TransportError> {
        self.channel.transmit(request).await
    }
}

/// Facade over the TCP stream channel for diagnostic sessions. The read
/// callback is supplied by the owner; this type only forwards lifecycle and
/// transmit calls.
pub struct TcpTransportHandler {
    config: TcpChannelConfig,
    channel: TcpChannel,
}

impl TcpTransportHandler {
    pub fn new(config: TcpChannelConfig, on_message: ReadHandler) -> Self {
        let local = SocketAddr::new(config.local_ip, config.local_port);
        let channel = TcpChannel::new(local, on_message);
        Self { config, channel }
    }

    pub fn initialize(&self) -> Result<(), TransportError> {
        self.channel.open()
    }

    /// Connect to the configured remote entity.
    pub async fn connect(&self) -> Result<(), TransportError> {
        self.channel
            .connect(self.config.remote_ip, self.config.remote_port)
            .await
    }

    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.channel.disconnect().await
    }

    pub async fn transmit(&self, message: UdsMessage) -> Result<(), TransportError> {
        self.channel.transmit(message).await
    }

    pub async fn stop(&self) {
        self.channel.close().await;
    }

    pub fn channel(&self) -> &TcpChannel {
        &self.channel
    }
}
