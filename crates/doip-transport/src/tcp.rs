//! TCP stream channel for diagnostic sessions
//!
//! One channel owns one TCP socket and one background reader task. The task
//! is spawned at construction and parks until a connected stream is handed
//! over; `connect` arms it, a peer disconnect or read error disarms it, and
//! `close` shuts it down and joins it. While armed it performs strictly
//! sequential receive cycles: header, payload, callback.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::TransportError;
use crate::message::UdsMessage;
use crate::wire::{Header, HEADER_LEN};

/// Receive-loop gate. `Idle` parks the reader, `Active` runs receive cycles,
/// `ShuttingDown` is terminal and unwinds the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Active,
    ShuttingDown,
}

/// Watch value pairing the gate state with the session generation it belongs
/// to. `connect` bumps the generation; a receive loop may only demote
/// `Active` to `Idle` while its own generation is still the current one, so
/// a stale stream's teardown cannot stomp a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gate {
    session: u64,
    state: ChannelState,
}

/// Callback receiving each fully assembled message, invoked on the reader
/// task. It must not block for long: the next receive cycle only starts once
/// it returns. It must also never call back into `close` on its own channel.
pub type ReadHandler = Arc<dyn Fn(UdsMessage) + Send + Sync>;

pub struct TcpChannel {
    local_addr: SocketAddr,
    /// Bound-but-unconnected socket between `open` and `connect`.
    socket: parking_lot::Mutex<Option<TcpSocket>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    /// Hand-off of the connected read half to the reader task, tagged with
    /// the session generation it belongs to.
    reader_tx: mpsc::Sender<(OwnedReadHalf, SocketAddr, u64)>,
    state: Arc<watch::Sender<Gate>>,
    reader_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl TcpChannel {
    /// Create the channel and spawn its reader task. Must be called from
    /// within a tokio runtime.
    pub fn new(local_addr: SocketAddr, handler: ReadHandler) -> Self {
        let (state_tx, _) = watch::channel(Gate {
            session: 0,
            state: ChannelState::Idle,
        });
        let state = Arc::new(state_tx);
        let (reader_tx, reader_rx) = mpsc::channel(1);

        let task = tokio::spawn(run_reader(Arc::clone(&state), reader_rx, handler));

        Self {
            local_addr,
            socket: parking_lot::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            reader_tx,
            state,
            reader_task: parking_lot::Mutex::new(Some(task)),
        }
    }

    /// Create the socket, enable address reuse and bind the local endpoint.
    pub fn open(&self) -> Result<(), TransportError> {
        let socket = TcpSocket::new_v4().map_err(|e| {
            error!(%e, "tcp socket open failed");
            TransportError::OpenFailed(e.to_string())
        })?;
        socket.set_reuseaddr(true).map_err(|e| {
            error!(%e, "tcp socket option failed");
            TransportError::OpenFailed(e.to_string())
        })?;
        socket.bind(self.local_addr).map_err(|e| {
            error!(%e, addr = %self.local_addr, "tcp socket bind failed");
            TransportError::BindFailed(e.to_string())
        })?;
        debug!(addr = %self.local_addr, "tcp socket opened and bound");
        *self.socket.lock() = Some(socket);
        Ok(())
    }

    /// Connect to the remote endpoint and arm the reader.
    ///
    /// On failure the channel stays idle; `open` must be called again before
    /// the next attempt (the socket is consumed by the connect).
    pub async fn connect(&self, host: IpAddr, port: u16) -> Result<(), TransportError> {
        let socket = self.socket.lock().take().ok_or(TransportError::NotOpen)?;
        let remote = SocketAddr::new(host, port);
        let stream = socket.connect(remote).await.map_err(|e| {
            error!(%e, %remote, "tcp connect failed");
            TransportError::ConnectionFailed(e.to_string())
        })?;
        let peer = stream
            .peer_addr()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (read_half, write_half) = stream.into_split();

        *self.writer.lock().await = Some(write_half);
        // Arm before the hand-off so the receive loop sees Active immediately.
        // Bumping the generation invalidates any still-running loop of the
        // previous session.
        let mut session = 0;
        self.state.send_modify(|gate| {
            gate.session += 1;
            gate.state = ChannelState::Active;
            session = gate.session;
        });
        self.reader_tx
            .send((read_half, peer, session))
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;

        info!(%peer, "tcp channel connected");
        Ok(())
    }

    /// Orderly shutdown of the session. The reader task survives and a new
    /// `open` + `connect` re-arms it.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            writer.shutdown().await.map_err(|e| {
                error!(%e, "tcp shutdown failed");
                TransportError::ConnectionFailed(e.to_string())
            })?;
        }
        *guard = None;
        self.state.send_modify(|gate| gate.state = ChannelState::Idle);
        debug!("tcp channel disconnected");
        Ok(())
    }

    /// Write the serialized message in full. Success means every byte was
    /// accepted by the transport.
    pub async fn transmit(&self, message: UdsMessage) -> Result<(), TransportError> {
        let frame = message.to_wire();
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::ConnectionClosed)?;
        writer.write_all(&frame).await.map_err(|e| {
            error!(%e, "tcp send failed");
            TransportError::SendFailed(e.to_string())
        })?;
        debug!(frame = %hex::encode(&frame), "tcp message sent");
        Ok(())
    }

    /// Current receive-loop state.
    pub fn state(&self) -> ChannelState {
        self.state.borrow().state
    }

    /// Request shutdown and join the reader task. Completes even while the
    /// reader is blocked mid-read.
    pub async fn close(&self) {
        self.state
            .send_modify(|gate| gate.state = ChannelState::ShuttingDown);
        *self.writer.lock().await = None;
        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        debug!("tcp channel closed");
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.state
            .send_modify(|gate| gate.state = ChannelState::ShuttingDown);
        if let Some(task) = self.reader_task.lock().take() {
            task.abort();
        }
    }
}

async fn run_reader(
    state: Arc<watch::Sender<Gate>>,
    mut reader_rx: mpsc::Receiver<(OwnedReadHalf, SocketAddr, u64)>,
    handler: ReadHandler,
) {
    let mut state_rx = state.subscribe();
    loop {
        // Park until a connected stream arrives or shutdown is requested.
        let (reader, peer, session) = tokio::select! {
            handed = reader_rx.recv() => match handed {
                Some(handed) => handed,
                None => break,
            },
            _ = state_rx.wait_for(|gate| gate.state == ChannelState::ShuttingDown) => break,
        };
        receive_loop(reader, peer, session, &state, &mut state_rx, &handler).await;
        if state_rx.borrow().state == ChannelState::ShuttingDown {
            break;
        }
    }
    debug!("tcp reader task stopped");
}

/// Sequential receive cycles on one connected stream. Returns when the
/// channel leaves `Active` or `session` is no longer the current generation;
/// the stream is dropped with it.
async fn receive_loop(
    mut reader: OwnedReadHalf,
    peer: SocketAddr,
    session: u64,
    state: &watch::Sender<Gate>,
    state_rx: &mut watch::Receiver<Gate>,
    handler: &ReadHandler,
) {
    loop {
        // borrow_and_update marks the arming transition as seen, so the
        // select below only wakes on transitions that happen after this
        // iteration began.
        let gate = *state_rx.borrow_and_update();
        if gate.session != session || gate.state != ChannelState::Active {
            return;
        }
        // read_exact is not cancel-safe, but a state change abandons the
        // whole stream, so a half-read frame is never resumed.
        let cycle = tokio::select! {
            frame = read_frame(&mut reader) => frame,
            _ = state_rx.changed() => continue,
        };
        match cycle {
            Ok((header, frame)) => {
                // A disconnect can race the read completing; once the channel
                // left Active the frame belongs to a dead session.
                let gate = *state_rx.borrow();
                if gate.session != session || gate.state != ChannelState::Active {
                    continue;
                }
                debug!(%peer, payload_type = %format_args!("{:#06x}", header.payload_type),
                       len = frame.len(), "tcp message received");
                // Back-pressure: the next receive cycle starts only after the
                // handler returns.
                handler(UdsMessage::from_frame(peer, header, &frame));
            }
            Err(TransportError::ConnectionClosed) => {
                debug!(%peer, "remote disconnected");
                demote_session(state, session);
                return;
            }
            Err(e) => {
                error!(%peer, %e, "tcp receive failed");
                demote_session(state, session);
                return;
            }
        }
    }
}

/// Move `Active` back to `Idle`, but only while `session` is still the
/// current generation: a newer connect owns the gate by then and the stale
/// stream's teardown must leave it alone.
fn demote_session(state: &watch::Sender<Gate>, session: u64) {
    state.send_if_modified(|gate| {
        if gate.session == session && gate.state == ChannelState::Active {
            gate.state = ChannelState::Idle;
            true
        } else {
            false
        }
    });
}

/// One receive cycle: fixed-size header, then exactly the announced number
/// of payload bytes. Returns the parsed header and the full frame.
async fn read_frame(reader: &mut OwnedReadHalf) -> Result<(Header, Vec<u8>), TransportError> {
    let mut head = [0u8; HEADER_LEN];
    reader.read_exact(&mut head).await.map_err(map_read_error)?;

    let header =
        Header::parse(&head).map_err(|e| TransportError::ProtocolError(e.to_string()))?;

    let mut frame = vec![0u8; HEADER_LEN + header.payload_length as usize];
    frame[..HEADER_LEN].copy_from_slice(&head);
    reader
        .read_exact(&mut frame[HEADER_LEN..])
        .await
        .map_err(map_read_error)?;
    Ok((header, frame))
}

fn map_read_error(e: io::Error) -> TransportError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed
    } else {
        TransportError::ReceiveFailed(e.to_string())
    }
}
