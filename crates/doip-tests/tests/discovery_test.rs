//! End-to-end discovery over loopback UDP
//!
//! A fake vehicle task answers every vehicle identification request with one
//! announcement; the client's broadcast address is pointed at it.

use std::net::SocketAddr;
use std::time::Duration;

use doip_client::{ClientConfig, DiagClient, DiscoveryError};
use doip_tests::announcement_frame;
use doip_transport::DiscoveryConfig;
use pretty_assertions::assert_eq;
use tokio::net::UdpSocket;

const COLLECT_WINDOW: Duration = Duration::from_millis(400);

/// Spawn a responder that answers identification requests with the given
/// identity. Returns its address.
async fn spawn_fake_vehicle(
    vin: &'static [u8; 17],
    logical_address: u16,
) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            // Vehicle identification request: payload type 0x0001, no payload.
            if len == 8 && buf[2..4] == [0x00, 0x01] {
                let frame = announcement_frame(
                    vin,
                    logical_address,
                    [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
                    [0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F],
                );
                let _ = socket.send_to(&frame, peer).await;
            }
        }
    });
    addr
}

fn config_towards(vehicle: SocketAddr) -> ClientConfig {
    ClientConfig {
        discovery: DiscoveryConfig {
            local_ip: "127.0.0.1".parse().unwrap(),
            local_port: 0,
            broadcast_ip: vehicle.ip(),
            broadcast_port: vehicle.port(),
        },
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn discovery_round_returns_decoded_record() {
    let vehicle = spawn_fake_vehicle(b"WVWZZZ1JZXW000001", 0x0E80).await;
    let client = DiagClient::new(config_towards(vehicle)).await.unwrap();

    let records = client.discover_vehicles_within(COLLECT_WINDOW).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.vin, "WVWZZZ1JZXW000001");
    assert_eq!(record.logical_address, 0x0E80);
    assert_eq!(record.eid, "01:02:03:04:05:06");
    assert_eq!(record.gid, "0a:0b:0c:0d:0e:0f");
    assert_eq!(record.ip_address, "127.0.0.1");

    client.shutdown().await;
}

#[tokio::test]
async fn silent_segment_reports_no_response() {
    // Bind a socket that never answers.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client = DiagClient::new(config_towards(silent.local_addr().unwrap()))
        .await
        .unwrap();

    let result = client
        .discover_vehicles_within(Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(DiscoveryError::NoResponseReceived)));

    client.shutdown().await;
}

#[tokio::test]
async fn second_round_starts_from_an_empty_store() {
    let vehicle = spawn_fake_vehicle(b"WVWZZZ1JZXW000002", 0x0E81).await;
    let client = DiagClient::new(config_towards(vehicle)).await.unwrap();

    let first = client.discover_vehicles_within(COLLECT_WINDOW).await.unwrap();
    assert_eq!(first.len(), 1);

    // The store was drained by the first round; the second round collects a
    // fresh announcement, not leftovers.
    let second = client.discover_vehicles_within(COLLECT_WINDOW).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].vin, "WVWZZZ1JZXW000002");

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_joins_receiver_while_blocked_on_recv() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client = DiagClient::new(config_towards(silent.local_addr().unwrap()))
        .await
        .unwrap();

    // The receiver task is blocked in recv_from; stop must still complete.
    tokio::time::timeout(Duration::from_secs(1), client.shutdown())
        .await
        .expect("shutdown should not hang");
}
