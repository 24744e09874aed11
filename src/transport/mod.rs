//! Duplex binary transport
//!
//! A transport is anything that can push binary chunks to the peer while
//! open. Lifecycle and inbound data arrive separately as [`TransportEvent`]s
//! on a channel owned by whoever drives the session.

pub mod tone_peer;
pub mod ws;

use bytes::Bytes;
use std::sync::Arc;

use crate::error::TransportError;

pub use ws::{WsConnector, WsTransport};

/// Outbound half of an open connection
pub trait Transport: Send + Sync {
    fn is_open(&self) -> bool;

    /// Queue a binary chunk. Silently dropped unless open.
    fn send(&self, chunk: Bytes);

    /// Begin closing. Safe to call repeatedly.
    fn close(&self);
}

/// Opens connections; each connection reports its events tagged with
/// the generation passed here
pub trait Connector: Send {
    fn connect(&mut self, generation: u64) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Something that happened on a connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    Open,
    Binary(Bytes),
    /// Non-binary payloads are not audio
    Text(String),
    Close,
    Error(String),
}

/// Event tagged with the connection it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(generation: u64, kind: TransportEventKind) -> Self {
        Self { generation, kind }
    }
}
