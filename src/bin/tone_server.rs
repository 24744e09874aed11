//! Tone Server Application
//!
//! Local stand-in for the speech service: greets every WebSocket client on
//! `/ws/audio` with a 440 Hz tone and swallows whatever audio it sends back.

use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voicelink::transport::tone_peer::{self, PeerStats};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = std::env::args().nth(1).unwrap_or_else(|| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Tone server listening on ws://{}/ws/audio", listener.local_addr()?);

    let stats = Arc::new(PeerStats::default());

    // Periodic stats
    let stats_for_log = stats.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            tracing::info!(
                "Peer stats: {} connections, {} frames, {:.1} KB received",
                stats_for_log.connections.load(Ordering::Relaxed),
                stats_for_log.frames_received(),
                stats_for_log.bytes_received() as f64 / 1024.0
            );
        }
    });

    tone_peer::serve(listener, stats).await?;
    Ok(())
}
