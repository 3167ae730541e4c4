//! Top-level client facade
//!
//! Wires a conversation to its UDP transport handler from a `ClientConfig`
//! and exposes the discovery API the application layer consumes.

use std::sync::Arc;
use std::time::Duration;

use doip_transport::{ReadHandler, TransportError};
use tracing::info;

use crate::config::ClientConfig;
use crate::conversation::{DiscoveryTransport, VdConversation};
use crate::error::DiscoveryError;
use crate::handler::{TcpTransportHandler, UdpTransportHandler};
use crate::vehicle_info::{VehicleIdentityRecord, VehicleListRequest};

pub struct DiagClient {
    config: ClientConfig,
    conversation: Arc<VdConversation>,
}

impl DiagClient {
    /// Build and start a client: conversation, handler, channel, receiver
    /// task. Ready for discovery when this returns.
    pub async fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let conversation = Arc::new(VdConversation::new(config.name.clone()));
        let handler = Arc::new(UdpTransportHandler::new(
            config.discovery.clone(),
            Arc::clone(&conversation),
        ));
        conversation.register_transport(handler as Arc<dyn DiscoveryTransport>);
        conversation.startup().await?;
        info!(name = %config.name, "diagnostic client started");
        Ok(Self {
            config,
            conversation,
        })
    }

    /// One discovery round with the configured collection window.
    pub async fn discover_vehicles(
        &self,
    ) -> Result<Vec<VehicleIdentityRecord>, DiscoveryError> {
        self.discover_vehicles_within(Duration::from_millis(self.config.collect_window_ms))
            .await
    }

    /// One discovery round with an explicit collection window.
    pub async fn discover_vehicles_within(
        &self,
        collect_window: Duration,
    ) -> Result<Vec<VehicleIdentityRecord>, DiscoveryError> {
        self.conversation
            .send_vehicle_identification_request(VehicleListRequest, collect_window)
            .await
    }

    pub fn conversation(&self) -> &Arc<VdConversation> {
        &self.conversation
    }

    /// Build a diagnostic-session handler towards the configured `[session]`
    /// endpoint. The read callback receives every inbound diagnostic message;
    /// the caller owns the handler's lifecycle (connect, transmit, stop).
    pub fn session_handler(
        &self,
        on_message: ReadHandler,
    ) -> Result<TcpTransportHandler, TransportError> {
        let session = self.config.session.clone().ok_or_else(|| {
            TransportError::InvalidConfig("no session endpoint configured".into())
        })?;
        Ok(TcpTransportHandler::new(session, on_message))
    }

    /// Stop the discovery channel and its receiver task.
    pub async fn shutdown(&self) {
        self.conversation.shutdown().await;
        info!(name = %self.config.name, "diagnostic client stopped");
    }
}
