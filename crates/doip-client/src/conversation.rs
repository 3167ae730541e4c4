//! Vehicle discovery conversation
//!
//! Correlates unsolicited announcement datagrams to one outbound broadcast
//! request. Announcements are decoded on the receiver task and inserted into
//! a keyed store; a discovery call transmits, waits the caller-supplied
//! window, then drains the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use doip_transport::{TransportError, VehicleIdentificationMessage, VehicleIdentificationRequest};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::DiscoveryError;
use crate::vehicle_info::{VehicleIdentityRecord, VehicleListRequest};

/// Capability set a conversation needs from its discovery transport.
#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    async fn initialize(&self) -> Result<(), TransportError>;

    fn start(&self) -> Result<(), TransportError>;

    async fn stop(&self);

    async fn transmit(
        &self,
        request: &VehicleIdentificationRequest,
    ) -> Result<(), TransportError>;
}

/// One vehicle-discovery conversation.
pub struct VdConversation {
    name: String,
    transport: RwLock<Option<Arc<dyn DiscoveryTransport>>>,
    /// Correlation store, keyed by logical address. Last writer wins; the
    /// lock is held only across an insert or the drain, never across I/O.
    collection: Mutex<HashMap<u16, VehicleIdentityRecord>>,
}

impl VdConversation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: RwLock::new(None),
            collection: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind the discovery transport this conversation talks through.
    pub fn register_transport(&self, transport: Arc<dyn DiscoveryTransport>) {
        *self.transport.write() = Some(transport);
    }

    /// Initialize and start the registered transport.
    pub async fn startup(&self) -> Result<(), TransportError> {
        let transport = self
            .transport
            .read()
            .clone()
            .ok_or_else(|| TransportError::InvalidConfig("no transport registered".into()))?;
        transport.initialize().await?;
        transport.start()?;
        debug!(conversation = %self.name, "conversation started");
        Ok(())
    }

    /// Stop the registered transport.
    pub async fn shutdown(&self) {
        let transport = self.transport.read().clone();
        if let Some(transport) = transport {
            transport.stop().await;
        }
        debug!(conversation = %self.name, "conversation shut down");
    }

    /// Run one discovery round: broadcast the request, collect announcements
    /// for `collect_window`, return every record seen.
    ///
    /// The window is deliberately a parameter: how long to wait for
    /// unsolicited responses is a policy of the surrounding application, not
    /// of this engine.
    pub async fn send_vehicle_identification_request(
        &self,
        request: VehicleListRequest,
        collect_window: Duration,
    ) -> Result<Vec<VehicleIdentityRecord>, DiscoveryError> {
        if !self.verify_request(&request) {
            return Err(DiscoveryError::InvalidParameters);
        }

        let transport = self
            .transport
            .read()
            .clone()
            .ok_or(DiscoveryError::TransportNotRegistered)?;
        transport
            .transmit(&VehicleIdentificationRequest)
            .await
            .map_err(DiscoveryError::TransmitFailed)?;

        tokio::time::sleep(collect_window).await;

        let records: Vec<VehicleIdentityRecord> = {
            let mut collection = self.collection.lock();
            collection.drain().map(|(_, record)| record).collect()
        };
        if records.is_empty() {
            return Err(DiscoveryError::NoResponseReceived);
        }
        info!(conversation = %self.name, count = records.len(), "vehicle discovery complete");
        Ok(records)
    }

    /// Inbound path, invoked from the discovery channel's receiver task.
    ///
    /// The record is fully decoded before insertion, so a drain snapshot
    /// never observes a partial record. A second announcement with the same
    /// logical address silently overwrites the first.
    pub fn handle_message(&self, message: VehicleIdentificationMessage) {
        match VehicleIdentityRecord::decode(message.peer.ip(), &message.payload) {
            Ok((logical_address, record)) => {
                debug!(conversation = %self.name,
                       logical_address = %format_args!("{logical_address:#06x}"),
                       vin = %record.vin, "vehicle identity stored");
                self.collection.lock().insert(logical_address, record);
            }
            Err(e) => {
                warn!(conversation = %self.name, peer = %message.peer, %e,
                      "dropping malformed vehicle announcement");
            }
        }
    }

    /// Request validation hook. Always true today; the explicit seam for
    /// future parameter constraints.
    fn verify_request(&self, _request: &VehicleListRequest) -> bool {
        true
    }

    /// Number of records currently accumulated (drained by the next
    /// completed discovery call).
    pub fn pending_records(&self) -> usize {
        self.collection.lock().len()
    }
}
