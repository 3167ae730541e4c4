//! TCP stream channel tests against a loopback listener
//!
//! Exercises the framing receive loop end to end: header read, length-driven
//! payload read, callback delivery, transmit, reconnect after EOF and
//! teardown while blocked.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use doip_client::{TcpTransportHandler, UdsMessage};
use doip_tests::{diagnostic_frame, raw_frame};
use doip_transport::{ChannelState, TcpChannel, TcpChannelConfig};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

fn local_any() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// Channel wired to an unbounded queue plus a listener to connect it to.
async fn connected_channel() -> (TcpChannel, mpsc::UnboundedReceiver<UdsMessage>, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let remote = listener.local_addr().unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let channel = TcpChannel::new(
        local_any(),
        Arc::new(move |message| {
            let _ = tx.send(message);
        }),
    );
    channel.open().unwrap();
    channel.connect(remote.ip(), remote.port()).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (channel, rx, server)
}

async fn next_message(rx: &mut mpsc::UnboundedReceiver<UdsMessage>) -> UdsMessage {
    timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("channel callback dropped")
}

#[tokio::test]
async fn receive_loop_reassembles_framed_messages() {
    let (channel, mut rx, mut server) = connected_channel().await;

    let payloads: [&[u8]; 3] = [&[], &[0x3E], &[0x62, 0xF1, 0x90, 0xAA, 0xBB]];
    for payload in payloads {
        server
            .write_all(&diagnostic_frame(0x0010, 0x0E80, payload))
            .await
            .unwrap();
    }

    for payload in payloads {
        let message = next_message(&mut rx).await;
        assert_eq!(message.payload, payload);
        assert_eq!(message.source_address, 0x0010);
        assert_eq!(message.target_address, 0x0E80);
        assert!(message.peer.is_some());
    }

    channel.close().await;
}

#[tokio::test]
async fn zero_length_frame_round_trips() {
    let (channel, mut rx, mut server) = connected_channel().await;

    // A bare header with length zero is a complete message.
    server.write_all(&raw_frame(0x0004, &[])).await.unwrap();
    let message = next_message(&mut rx).await;
    assert!(message.payload.is_empty());

    channel.close().await;
}

#[tokio::test]
async fn messages_arrive_in_order_without_interleaving() {
    let (channel, mut rx, mut server) = connected_channel().await;

    // Two frames in a single write; the receive loop must split them.
    let mut bytes = diagnostic_frame(0x0010, 0x0E80, &[0x01]);
    bytes.extend_from_slice(&diagnostic_frame(0x0010, 0x0E80, &[0x02, 0x03]));
    server.write_all(&bytes).await.unwrap();

    assert_eq!(next_message(&mut rx).await.payload, vec![0x01]);
    assert_eq!(next_message(&mut rx).await.payload, vec![0x02, 0x03]);

    channel.close().await;
}

#[tokio::test]
async fn transmit_writes_the_full_frame() {
    let (channel, _rx, mut server) = connected_channel().await;

    channel
        .transmit(UdsMessage::request(0x0E80, 0x0010, vec![0x22, 0xF1, 0x90]))
        .await
        .unwrap();

    let mut received = vec![0u8; 15];
    timeout(TEST_TIMEOUT, server.read_exact(&mut received))
        .await
        .expect("timed out reading frame")
        .unwrap();
    assert_eq!(received, diagnostic_frame(0x0E80, 0x0010, &[0x22, 0xF1, 0x90]));

    channel.close().await;
}

#[tokio::test]
async fn peer_disconnect_idles_channel_and_reconnect_rearms_it() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let remote = listener.local_addr().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let channel = TcpChannel::new(
        local_any(),
        Arc::new(move |message| {
            let _ = tx.send(message);
        }),
    );

    channel.open().unwrap();
    channel.connect(remote.ip(), remote.port()).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    assert_eq!(channel.state(), ChannelState::Active);

    // Clean end-of-stream deactivates the session but not the task.
    drop(server);
    timeout(TEST_TIMEOUT, async {
        while channel.state() != ChannelState::Idle {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("channel should go idle after EOF");

    // A fresh open + connect re-arms the same reader task.
    channel.open().unwrap();
    channel.connect(remote.ip(), remote.port()).await.unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    server
        .write_all(&diagnostic_frame(0x0010, 0x0E80, &[0x50, 0x01]))
        .await
        .unwrap();
    let message = next_message(&mut rx).await;
    assert_eq!(message.payload, vec![0x50, 0x01]);

    channel.close().await;
}

#[tokio::test]
async fn immediate_reconnect_survives_stale_stream_teardown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let remote = listener.local_addr().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let channel = TcpChannel::new(
        local_any(),
        Arc::new(move |message| {
            let _ = tx.send(message);
        }),
    );
    channel.open().unwrap();
    channel.connect(remote.ip(), remote.port()).await.unwrap();
    let (old_server, _) = listener.accept().await.unwrap();

    // Reconnect straight away, without giving the reader task a chance to
    // observe the idle transition from the disconnect.
    channel.disconnect().await.unwrap();
    channel.open().unwrap();
    channel.connect(remote.ip(), remote.port()).await.unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    // The old stream's end-of-stream must not knock the new session back to
    // idle.
    drop(old_server);
    server
        .write_all(&diagnostic_frame(0x0010, 0x0E80, &[0x3E, 0x00]))
        .await
        .unwrap();
    let message = next_message(&mut rx).await;
    assert_eq!(message.payload, vec![0x3E, 0x00]);
    assert_eq!(channel.state(), ChannelState::Active);

    channel.close().await;
}

#[tokio::test]
async fn close_completes_while_reader_is_blocked() {
    let (channel, _rx, _server) = connected_channel().await;

    // The reader task is blocked mid-header; close must still join it.
    timeout(Duration::from_secs(1), channel.close())
        .await
        .expect("close should not hang on a blocked read");
}

#[tokio::test]
async fn disconnect_stops_reads_but_keeps_channel_reusable() {
    let (channel, mut rx, mut server) = connected_channel().await;

    channel.disconnect().await.unwrap();
    assert_eq!(channel.state(), ChannelState::Idle);

    // Frames written after the disconnect are not delivered.
    let _ = server
        .write_all(&diagnostic_frame(0x0010, 0x0E80, &[0x7E, 0x00]))
        .await;
    let late = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(late.is_err(), "no message expected after disconnect");

    channel.close().await;
}

#[tokio::test]
async fn session_handler_carries_a_request_response_exchange() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let remote = listener.local_addr().unwrap();

    let config = TcpChannelConfig {
        local_ip: "127.0.0.1".parse().unwrap(),
        local_port: 0,
        remote_ip: remote.ip(),
        remote_port: remote.port(),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = TcpTransportHandler::new(
        config,
        Arc::new(move |message| {
            let _ = tx.send(message);
        }),
    );

    handler.initialize().unwrap();
    handler.connect().await.unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    // Request out.
    handler
        .transmit(UdsMessage::request(0x0E80, 0x0010, vec![0x10, 0x03]))
        .await
        .unwrap();
    let mut request = vec![0u8; 14];
    timeout(TEST_TIMEOUT, server.read_exact(&mut request))
        .await
        .expect("timed out reading request")
        .unwrap();
    assert_eq!(request, diagnostic_frame(0x0E80, 0x0010, &[0x10, 0x03]));

    // Response back through the read callback.
    server
        .write_all(&diagnostic_frame(0x0010, 0x0E80, &[0x50, 0x03]))
        .await
        .unwrap();
    let response = next_message(&mut rx).await;
    assert_eq!(response.payload, vec![0x50, 0x03]);
    assert_eq!(response.source_address, 0x0010);

    handler.disconnect().await.unwrap();
    handler.stop().await;
}

#[tokio::test]
async fn connect_without_open_is_rejected() {
    let channel = TcpChannel::new(local_any(), Arc::new(|_| {}));
    let result = channel.connect("127.0.0.1".parse().unwrap(), 1).await;
    assert!(result.is_err());
    channel.close().await;
}
