//! WebSocket transport against the local tone peer

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use voicelink::config::TransportConfig;
use voicelink::error::TransportError;
use voicelink::transport::tone_peer::{self, PeerStats, TONE_CHUNK_BYTES};
use voicelink::transport::{Connector, TransportEvent, TransportEventKind, WsConnector};

async fn start_peer() -> (String, Arc<PeerStats>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(PeerStats::default());
    tokio::spawn(tone_peer::serve(listener, stats.clone()));
    (format!("ws://{}/ws/audio", addr), stats)
}

async fn next_event(events: &mut UnboundedReceiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event channel closed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tone_greeting_and_upload() {
    let (url, stats) = start_peer().await;
    let config = TransportConfig {
        url,
        connect_timeout_ms: 5_000,
    };
    let (mut connector, mut events) = WsConnector::channel(&config, tokio::runtime::Handle::current());

    let transport = connector.connect(7).unwrap();
    assert!(!transport.is_open());

    let opened = next_event(&mut events).await;
    assert_eq!(opened.generation, 7);
    assert!(matches!(opened.kind, TransportEventKind::Open));
    assert!(transport.is_open());

    // 0.5 s of 16 kHz PCM16 in 100 ms pieces
    let mut received = 0;
    for _ in 0..5 {
        match next_event(&mut events).await.kind {
            TransportEventKind::Binary(chunk) => {
                assert_eq!(chunk.len(), TONE_CHUNK_BYTES);
                received += chunk.len();
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(received, 16000);

    transport.send(Bytes::from(vec![0u8; 2048]));
    transport.send(Bytes::from(vec![0u8; 2048]));
    for _ in 0..100 {
        if stats.frames_received() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stats.frames_received(), 2);
    assert_eq!(stats.bytes_received(), 4096);

    transport.close();
    transport.close();
    assert!(!transport.is_open());

    let closed = next_event(&mut events).await;
    assert!(matches!(closed.kind, TransportEventKind::Close));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_peer_reports_error_then_close() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = TransportConfig {
        url: format!("ws://{}/ws/audio", addr),
        connect_timeout_ms: 2_000,
    };
    let (mut connector, mut events) = WsConnector::channel(&config, tokio::runtime::Handle::current());
    let transport = connector.connect(1).unwrap();

    assert!(matches!(next_event(&mut events).await.kind, TransportEventKind::Error(_)));
    assert!(matches!(next_event(&mut events).await.kind, TransportEventKind::Close));
    assert!(!transport.is_open());

    // Sending on a dead transport is a silent no-op
    transport.send(Bytes::from_static(&[0, 0]));
}

#[tokio::test]
async fn test_rejects_non_websocket_url() {
    let config = TransportConfig {
        url: "http://localhost:8000/ws/audio".into(),
        connect_timeout_ms: 1_000,
    };
    let (mut connector, _events) = WsConnector::channel(&config, tokio::runtime::Handle::current());
    assert!(matches!(connector.connect(1), Err(TransportError::InvalidUrl(_))));
}
