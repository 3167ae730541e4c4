//! Test utilities
//!
//! A mock discovery transport so conversation logic can be exercised without
//! sockets.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use doip_transport::{TransportError, VehicleIdentificationRequest};

use crate::conversation::DiscoveryTransport;

/// Mock discovery transport with a switchable transmit failure.
#[derive(Default)]
pub struct MockDiscoveryTransport {
    fail_transmit: AtomicBool,
    transmit_count: AtomicUsize,
}

impl MockDiscoveryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `transmit` calls fail (or succeed again).
    pub fn set_fail_transmit(&self, fail: bool) {
        self.fail_transmit.store(fail, Ordering::SeqCst);
    }

    /// Number of transmit attempts observed, including failed ones.
    pub fn transmit_count(&self) -> usize {
        self.transmit_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryTransport for MockDiscoveryTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) {}

    async fn transmit(
        &self,
        _request: &VehicleIdentificationRequest,
    ) -> Result<(), TransportError> {
        self.transmit_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_transmit.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("mock transmit failure".into()));
        }
        Ok(())
    }
}
