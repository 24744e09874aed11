//! WebSocket client transport
//!
//! Each connection runs as one tokio task that owns the socket. The
//! [`WsTransport`] handle only flips flags and queues outbound messages, so
//! it can be called from the real-time capture thread without blocking.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::transport::{Connector, Transport, TransportEvent, TransportEventKind};

enum Outbound {
    Binary(Bytes),
    Close,
}

/// Handle to one WebSocket connection
pub struct WsTransport {
    open: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WsTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn send(&self, chunk: Bytes) {
        if !self.is_open() {
            tracing::trace!("Socket not open, dropping {} bytes", chunk.len());
            return;
        }
        let _ = self.outbound.send(Outbound::Binary(chunk));
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

/// Opens WebSocket connections on a tokio runtime
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    runtime: tokio::runtime::Handle,
}

impl WsConnector {
    pub fn new(
        config: &TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            url: config.url.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            events,
            runtime,
        }
    }

    /// Connector plus the receiver its connections report to
    pub fn channel(
        config: &TransportConfig,
        runtime: tokio::runtime::Handle,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, tx, runtime), rx)
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, generation: u64) -> Result<Arc<dyn Transport>, TransportError> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(TransportError::InvalidUrl(self.url.clone()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let connection = Connection {
            url: self.url.clone(),
            connect_timeout: self.connect_timeout,
            generation,
            open: open.clone(),
            closed: closed.clone(),
            events: self.events.clone(),
        };
        self.runtime.spawn(connection.run(outbound_rx));

        Ok(Arc::new(WsTransport {
            open,
            closed,
            outbound: outbound_tx,
        }))
    }
}

struct Connection {
    url: String,
    connect_timeout: Duration,
    generation: u64,
    open: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl Connection {
    fn emit(&self, kind: TransportEventKind) {
        let _ = self.events.send(TransportEvent::new(self.generation, kind));
    }

    async fn run(self, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
        tracing::debug!("Connecting to {} (generation {})", self.url, self.generation);

        let ws = match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => {
                self.finish(Some(format!("Failed to connect WebSocket: {}", e)));
                return;
            }
            Err(_) => {
                self.finish(Some("WebSocket connection timed out".to_string()));
                return;
            }
        };

        let (mut sink, mut stream) = ws.split();

        if self.closed.load(Ordering::Acquire) {
            let _ = sink.send(Message::Close(None)).await;
            self.finish(None);
            return;
        }

        self.open.store(true, Ordering::Release);
        tracing::info!("WebSocket connected to {}", self.url);
        self.emit(TransportEventKind::Open);

        let mut error = None;
        loop {
            tokio::select! {
                out = outbound.recv() => match out {
                    Some(Outbound::Binary(chunk)) => {
                        if let Err(e) = sink.send(Message::Binary(chunk.to_vec())).await {
                            error = Some(e.to_string());
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
                msg = stream.next() => match msg {
                    Some(Ok(Message::Binary(data))) => {
                        self.emit(TransportEventKind::Binary(Bytes::from(data)));
                    }
                    Some(Ok(Message::Text(text))) => {
                        self.emit(TransportEventKind::Text(text));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!("Peer closed: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error = Some(e.to_string());
                        break;
                    }
                    None => break,
                },
            }
        }

        self.finish(error);
    }

    /// Report an optional error followed by close
    fn finish(&self, error: Option<String>) {
        self.open.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);

        if let Some(e) = error {
            tracing::warn!("WebSocket error: {}", e);
            self.emit(TransportEventKind::Error(e));
        }
        tracing::info!("WebSocket closed (generation {})", self.generation);
        self.emit(TransportEventKind::Close);
    }
}
