//! UDP discovery channel
//!
//! Broadcasts vehicle identification requests and forwards every
//! vehicle-announcement datagram to the indication callback. Correlation of
//! responses to the request is the conversation layer's job; this channel
//! only frames, sends and forwards.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DiscoveryConfig;
use crate::error::TransportError;
use crate::message::{VehicleIdentificationMessage, VehicleIdentificationRequest};
use crate::wire::{payload_type, Header, HEADER_LEN};

/// Largest datagram the receiver accepts. Announcements are tiny; anything
/// bigger than this is not a discovery response.
const MAX_DATAGRAM_LEN: usize = 1024;

/// Callback receiving each announcement, invoked on the receiver task.
pub type IndicationHandler = Arc<dyn Fn(VehicleIdentificationMessage) + Send + Sync>;

pub struct UdpDiscoveryChannel {
    config: DiscoveryConfig,
    socket: parking_lot::Mutex<Option<Arc<UdpSocket>>>,
    shutdown: Arc<watch::Sender<bool>>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    handler: IndicationHandler,
}

impl UdpDiscoveryChannel {
    pub fn new(config: DiscoveryConfig, handler: IndicationHandler) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            socket: parking_lot::Mutex::new(None),
            shutdown: Arc::new(shutdown),
            task: parking_lot::Mutex::new(None),
            handler,
        }
    }

    /// Bind the socket with broadcast permission.
    pub async fn initialize(&self) -> Result<(), TransportError> {
        let local = SocketAddr::new(self.config.local_ip, self.config.local_port);
        let socket = UdpSocket::bind(local).await.map_err(|e| {
            error!(%e, addr = %local, "udp socket bind failed");
            TransportError::BindFailed(e.to_string())
        })?;
        socket.set_broadcast(true).map_err(|e| {
            error!(%e, "enabling broadcast failed");
            TransportError::OpenFailed(e.to_string())
        })?;
        debug!(addr = %local, "udp socket bound, broadcast enabled");
        *self.socket.lock() = Some(Arc::new(socket));
        Ok(())
    }

    /// Spawn the receiver task.
    pub fn start(&self) -> Result<(), TransportError> {
        let socket = self.socket.lock().clone().ok_or(TransportError::NotOpen)?;
        let handler = Arc::clone(&self.handler);
        let shutdown_rx = self.shutdown.subscribe();
        *self.task.lock() = Some(tokio::spawn(receive_loop(socket, handler, shutdown_rx)));
        Ok(())
    }

    /// Cooperative shutdown: wake the receiver, drop the socket, join the
    /// task. The channel can be re-initialized afterwards.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        *self.socket.lock() = None;
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        // Re-arm for a future initialize/start cycle.
        self.shutdown.send_replace(false);
        debug!("udp discovery channel stopped");
    }

    /// Serialize the request and send it to the configured broadcast address.
    pub async fn transmit(
        &self,
        request: &VehicleIdentificationRequest,
    ) -> Result<(), TransportError> {
        let socket = self.socket.lock().clone().ok_or(TransportError::NotOpen)?;
        let frame = request.to_wire();
        let target = SocketAddr::new(self.config.broadcast_ip, self.config.broadcast_port);
        let sent = socket.send_to(&frame, target).await.map_err(|e| {
            error!(%e, %target, "udp send failed");
            TransportError::SendFailed(e.to_string())
        })?;
        if sent != frame.len() {
            return Err(TransportError::SendFailed(format!(
                "short datagram write ({sent} of {} bytes)",
                frame.len()
            )));
        }
        info!(%target, "vehicle identification request broadcast");
        Ok(())
    }
}

impl Drop for UdpDiscoveryChannel {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    handler: IndicationHandler,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    loop {
        let (len, peer) = tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    error!(%e, "udp receive failed");
                    break;
                }
            },
            _ = shutdown.wait_for(|&requested| requested) => break,
        };
        if let Some(message) = parse_datagram(&buf[..len], peer) {
            handler(message);
        }
    }
    debug!("udp receiver task stopped");
}

/// Validate the frame and strip the generic header. Anything that is not a
/// well-formed vehicle announcement is dropped here.
fn parse_datagram(data: &[u8], peer: SocketAddr) -> Option<VehicleIdentificationMessage> {
    if data.len() < HEADER_LEN {
        warn!(%peer, len = data.len(), "datagram shorter than doip header, dropped");
        return None;
    }
    let mut head = [0u8; HEADER_LEN];
    head.copy_from_slice(&data[..HEADER_LEN]);
    let header = match Header::parse(&head) {
        Ok(header) => header,
        Err(e) => {
            warn!(%peer, %e, "malformed datagram header, dropped");
            return None;
        }
    };
    if header.payload_type != payload_type::VEHICLE_ANNOUNCEMENT {
        debug!(%peer, payload_type = %format_args!("{:#06x}", header.payload_type),
               "ignoring non-announcement datagram");
        return None;
    }
    let end = HEADER_LEN + header.payload_length as usize;
    if data.len() < end {
        warn!(%peer, announced = header.payload_length, actual = data.len() - HEADER_LEN,
              "truncated announcement, dropped");
        return None;
    }
    debug!(%peer, payload = %hex::encode(&data[HEADER_LEN..end]), "vehicle announcement received");
    Some(VehicleIdentificationMessage::reception(
        peer,
        data[HEADER_LEN..end].to_vec(),
    ))
}
