//! # Voicelink
//!
//! Real-time bidirectional voice over a binary WebSocket: microphone audio is
//! reduced to 16 kHz mono PCM16 and streamed out, and PCM16 chunks coming back
//! from the remote peer are reconstructed into playable audio.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                               CAPTURE SIDE                                │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌──────────────┐  │
//! │  │ Microphone  │──▶│  Resampler  │──▶│ PCM16 Enc.  │──▶│  Transport   │  │
//! │  │ (cpal, N Hz)│   │ (box filter)│   │ (clamp, LE) │   │ (WebSocket)  │  │
//! │  └─────────────┘   └─────────────┘   └─────────────┘   └──────┬───────┘  │
//! │                                                               │          │
//! └───────────────────────────────────────────────────────────────┼──────────┘
//!                                                                 │
//!                                 16 kHz mono PCM16 LE chunks     │
//!                                                                 │
//! ┌───────────────────────────────────────────────────────────────┼──────────┐
//! │                               PLAYBACK SIDE                   ▼          │
//! │                                            ┌──────────────────────────┐  │
//! │                                            │   PlaybackReconstructor  │  │
//! │                                            │ ┌──────────┐ ┌─────────┐ │  │
//! │                                            │ │Streaming │ │Buffered │ │  │
//! │                                            │ │per chunk │ │WAV clip │ │  │
//! │                                            │ └────┬─────┘ └────┬────┘ │  │
//! │                                            └──────┼────────────┼──────┘  │
//! │                                                   ▼            ▼         │
//! │                                            ┌──────────────────────────┐  │
//! │                                            │  Playback engine (cpal)  │  │
//! │                                            └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`session::Session`] owns the connection lifecycle and routes frames
//! between the transport, the capture pipeline and the reconstructor.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod transport;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Wire sample rate in both directions
    pub const TARGET_SAMPLE_RATE: u32 = 16000;

    /// Default rate requested from the capture device
    pub const DEFAULT_CAPTURE_SAMPLE_RATE: u32 = 48000;

    /// Wire channel count (mono)
    pub const CHANNELS: u16 = 1;

    /// Bits per wire sample
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Bytes per wire sample
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Default capture block size in frames
    pub const DEFAULT_BLOCK_SIZE: usize = 4096;

    /// Default WebSocket endpoint of the speech service
    pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/audio";

    /// Default connect timeout in milliseconds
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

    /// How long a cpal stream thread may take to report ready
    pub const DEVICE_OPEN_TIMEOUT_MS: u64 = 3_000;

    /// Output engine queue capacity (in playback units)
    pub const PLAYBACK_QUEUE_CAPACITY: usize = 256;

    /// Canonical WAV header length
    pub const WAV_HEADER_LEN: usize = 44;
}
