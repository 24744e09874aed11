//! Session controller
//!
//! Owns one connection at a time and reacts to its events:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──Open──▶ Connected
//!       ▲                         │                    │
//!       └──────── Close / Error / disconnect() ────────┘
//! ```
//!
//! Each connection gets a new generation number. Events carrying an older
//! generation belong to a connection that has already been torn down and
//! are ignored.

use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::audio::capture::{CapturePipeline, CaptureSource, CaptureState, CaptureStats};
use crate::config::{AppConfig, CaptureStart, PlaybackMode};
use crate::constants::TARGET_SAMPLE_RATE;
use crate::error::{AudioError, PlaybackError, Result, SessionError};
use crate::playback::{
    reconstructor_for, EngineStats, PlayOutcome, PlaybackEngine, PlaybackReconstructor, ReconstructorStats,
};
use crate::transport::{Connector, Transport, TransportEvent, TransportEventKind};

/// Oldest entries are dropped past this many
const SESSION_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Timestamped, user-facing event log
#[derive(Debug, Default, Clone)]
pub struct SessionLog {
    entries: VecDeque<String>,
}

impl SessionLog {
    pub fn push(&mut self, message: impl AsRef<str>) {
        if self.entries.len() == SESSION_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("{} - {}", Local::now().format("%H:%M:%S"), message.as_ref()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.contains(needle))
    }
}

/// Snapshot for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub generation: u64,
    pub playback_mode: PlaybackMode,
    pub capturing: bool,
    pub capture: CaptureStats,
    pub playback: ReconstructorStats,
    pub output: EngineStats,
}

/// Session-relevant slice of the configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub capture_start: CaptureStart,
    pub capture_rate: u32,
    pub target_rate: u32,
    pub block_size: usize,
    pub playback_mode: PlaybackMode,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            capture_start: config.session.capture_start,
            capture_rate: config.capture.requested_rate(),
            target_rate: TARGET_SAMPLE_RATE,
            block_size: config.capture.block_size,
            playback_mode: config.playback.mode,
        }
    }
}

pub struct Session<S: CaptureSource> {
    settings: SessionSettings,
    state: SessionState,
    generation: u64,
    connector: Box<dyn Connector>,
    transport: Option<Arc<dyn Transport>>,
    capture: CapturePipeline<S>,
    reconstructor: Box<dyn PlaybackReconstructor>,
    engine: Arc<dyn PlaybackEngine>,
    log: SessionLog,
}

impl<S: CaptureSource> Session<S> {
    pub fn new(
        settings: SessionSettings,
        connector: Box<dyn Connector>,
        source: S,
        engine: Arc<dyn PlaybackEngine>,
    ) -> Self {
        Self {
            settings,
            state: SessionState::Disconnected,
            generation: 0,
            connector,
            transport: None,
            capture: CapturePipeline::new(source, settings.block_size),
            reconstructor: reconstructor_for(settings.playback_mode, engine.clone()),
            engine,
            log: SessionLog::default(),
        }
    }

    /// Open a new connection, dropping any half-open one
    pub fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Err(SessionError::AlreadyConnected.into());
        }

        if let Some(previous) = self.transport.take() {
            self.capture.stop();
            previous.close();
        }

        self.log.clear();
        self.reconstructor.reset();
        self.generation += 1;

        match self.connector.connect(self.generation) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = SessionState::Connecting;
                self.log.push("Connecting...");
                tracing::info!("Session connecting (generation {})", self.generation);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                self.log.push(format!("Connection failed: {}", e));
                tracing::warn!("Connection failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Route one transport event
    pub fn handle_event(&mut self, event: TransportEvent) {
        if event.generation != self.generation || self.transport.is_none() {
            tracing::debug!(
                "Ignoring {} from stale connection {} (current {})",
                event_name(&event.kind),
                event.generation,
                self.generation
            );
            return;
        }

        match event.kind {
            TransportEventKind::Open => self.on_open(),
            TransportEventKind::Binary(chunk) => self.on_binary(chunk),
            TransportEventKind::Text(text) => {
                tracing::debug!("Ignoring {} byte text message", text.len());
            }
            TransportEventKind::Close => {
                self.log.push("WebSocket closed");
                self.teardown();
            }
            TransportEventKind::Error(e) => {
                self.log.push("WebSocket error");
                tracing::warn!("Transport error: {}", e);
                self.teardown();
            }
        }
    }

    /// Begin capture; only valid while connected
    pub fn start_talking(&mut self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(SessionError::NotConnected.into());
        }
        self.start_capture()
    }

    pub fn stop_talking(&mut self) {
        if self.capture.is_streaming() {
            self.log.push("Microphone stopped");
        }
        self.capture.stop();
    }

    /// Check the microphone for a failure raised after it started. A failed
    /// capture is stopped; the connection stays up.
    pub fn poll_capture(&mut self) -> Option<AudioError> {
        let error = self.capture.check_error()?;
        self.log.push(format!("Microphone error: {}", error));
        tracing::warn!("Capture failed: {}", error);
        self.capture.stop();
        Some(error)
    }

    /// Play whatever the reconstructor holds
    pub fn play(&mut self) -> std::result::Result<PlayOutcome, PlaybackError> {
        match self.reconstructor.play() {
            Ok(PlayOutcome::NoBufferedData) => {
                self.log.push("No audio received yet");
                Ok(PlayOutcome::NoBufferedData)
            }
            Ok(PlayOutcome::Played { bytes }) => {
                self.log.push(format!("Playing buffered audio ({} bytes)", bytes));
                Ok(PlayOutcome::Played { bytes })
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.log.push(format!("Playback failed: {}", e));
                Err(e)
            }
        }
    }

    /// Stop capture, close the transport and release audio output, in
    /// that order. Safe to call at any time.
    pub fn disconnect(&mut self) {
        self.capture.stop();
        if let Some(transport) = self.transport.take() {
            transport.close();
            self.log.push("Disconnected");
        }
        self.reconstructor.release();
        self.state = SessionState::Disconnected;
        tracing::info!("Session disconnected");
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn capture_source(&self) -> &S {
        self.capture.source()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            generation: self.generation,
            playback_mode: self.reconstructor.mode(),
            capturing: self.capture.is_streaming(),
            capture: self.capture.stats(),
            playback: self.reconstructor.stats(),
            output: self.engine.stats(),
        }
    }

    fn on_open(&mut self) {
        self.state = SessionState::Connected;
        self.log.push("WebSocket connected");
        tracing::info!("Session connected");

        if self.settings.capture_start == CaptureStart::OnConnect {
            // Denial is already logged; the session stays usable
            let _ = self.start_capture();
        }
    }

    fn on_binary(&mut self, chunk: Bytes) {
        let len = chunk.len();
        if len == 0 {
            tracing::debug!("Ignoring empty binary message");
            return;
        }
        match self.reconstructor.on_chunk(chunk) {
            Ok(()) => match self.reconstructor.mode() {
                PlaybackMode::Streaming => self.log.push(format!("Playing audio chunk ({} bytes)", len)),
                PlaybackMode::Buffered => self.log.push(format!("Buffered audio chunk ({} bytes)", len)),
            },
            Err(e) => self.log.push(format!("Dropped audio chunk: {}", e)),
        }
    }

    fn start_capture(&mut self) -> Result<()> {
        let transport = self.transport.clone().ok_or(SessionError::NotConnected)?;
        let resampled = self.settings.capture_rate != self.settings.target_rate;

        match self
            .capture
            .start(self.settings.capture_rate, self.settings.target_rate, transport)
        {
            Ok(()) => {
                if resampled {
                    self.log.push("Microphone streaming started (16kHz resampled)");
                } else {
                    self.log.push("Microphone streaming started (16kHz)");
                }
                Ok(())
            }
            Err(e) => {
                self.log.push("Microphone access denied");
                Err(e.into())
            }
        }
    }

    /// Transport-driven teardown; audio output stays available
    fn teardown(&mut self) {
        self.stop_talking();
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.state = SessionState::Disconnected;
        tracing::info!("Session closed by transport");
    }
}

impl<S: CaptureSource> Drop for Session<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn event_name(kind: &TransportEventKind) -> &'static str {
    match kind {
        TransportEventKind::Open => "open",
        TransportEventKind::Binary(_) => "binary",
        TransportEventKind::Text(_) => "text",
        TransportEventKind::Close => "close",
        TransportEventKind::Error(_) => "error",
    }
}
