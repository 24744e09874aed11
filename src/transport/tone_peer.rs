//! Minimal speech-service stand-in
//!
//! Serves `/ws/audio`: every connection is greeted with the fallback tone in
//! 100 ms chunks, after which inbound binary frames are counted and
//! discarded and text frames are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::tone::default_fallback_tone;

/// 100 ms of 16 kHz PCM16
pub const TONE_CHUNK_BYTES: usize = 3200;

/// Counters shared by all connections
#[derive(Debug, Default)]
pub struct PeerStats {
    pub connections: AtomicU64,
    pub frames_received: AtomicU64,
    pub bytes_received: AtomicU64,
}

impl PeerStats {
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }
}

pub fn router(stats: Arc<PeerStats>) -> Router {
    Router::new()
        .route("/ws/audio", get(ws_handler))
        .with_state(stats)
}

/// Serve until the listener fails
pub async fn serve(listener: tokio::net::TcpListener, stats: Arc<PeerStats>) -> std::io::Result<()> {
    axum::serve(listener, router(stats)).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(stats): State<Arc<PeerStats>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, stats))
}

async fn handle_socket(mut socket: WebSocket, stats: Arc<PeerStats>) {
    let id = stats.connections.fetch_add(1, Ordering::Relaxed);
    tracing::info!("Peer connection {} opened", id);

    let tone = default_fallback_tone();
    for chunk in tone.chunks(TONE_CHUNK_BYTES) {
        if socket.send(Message::Binary(chunk.to_vec())).await.is_err() {
            tracing::info!("Peer connection {} went away during greeting", id);
            return;
        }
    }
    tracing::info!("Sent {} byte tone to connection {}, idling", tone.len(), id);

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Binary(data)) => {
                stats.frames_received.fetch_add(1, Ordering::Relaxed);
                stats.bytes_received.fetch_add(data.len() as u64, Ordering::Relaxed);
                tracing::debug!("Received {} bytes from connection {}", data.len(), id);
            }
            Ok(Message::Text(_)) => {
                tracing::warn!("Received text frame on connection {}, ignoring", id);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Connection {} error: {}", id, e);
                break;
            }
        }
    }

    tracing::info!("Peer connection {} closed", id);
}
