//! Playback reconstruction
//!
//! Inbound PCM16 chunks become sound through one of two strategies, picked
//! when the session is configured:
//!
//! - [`StreamingReconstructor`] decodes every chunk and submits it to the
//!   engine immediately; the engine queues units back to back.
//! - [`BufferedReconstructor`] keeps the raw chunks and, on request, plays
//!   them as one WAV clip.

pub mod buffered;
pub mod output;
pub mod streaming;

use bytes::Bytes;
use std::sync::Arc;

use crate::audio::buffer::AudioFrame;
use crate::config::PlaybackMode;
use crate::error::{Error, PlaybackError};

pub use buffered::{BufferedReconstructor, PlaybackBuffer};
pub use output::CpalPlayback;
pub use streaming::StreamingReconstructor;

/// Sink for audible output
pub trait PlaybackEngine: Send + Sync {
    /// Play an in-memory unit as soon as the units before it finish
    fn play_unit(&self, unit: AudioFrame) -> Result<(), PlaybackError>;

    /// Decode and play a self-contained WAV clip
    fn play_container(&self, container: Bytes) -> Result<(), PlaybackError>;

    /// Silence output and free the device. Safe to call repeatedly; the next
    /// submission reopens it.
    fn release(&self);

    fn stats(&self) -> EngineStats {
        EngineStats::default()
    }
}

/// Output queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    /// Units waiting to be played
    pub queued: usize,
    /// Units refused because the queue was full
    pub overflows: usize,
    /// Times a unit ran out with nothing queued behind it
    pub underruns: usize,
}

/// Result of an explicit play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Streaming mode plays as chunks arrive; nothing to do
    Streaming,
    /// Nothing has been buffered yet
    NoBufferedData,
    /// A container of this many bytes was submitted
    Played { bytes: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconstructorStats {
    pub chunks_received: u64,
    pub bytes_received: u64,
    /// Units or containers accepted by the engine
    pub submitted: u64,
    pub malformed: u64,
    pub rejected: u64,
}

/// Turns inbound chunks into playback
pub trait PlaybackReconstructor: Send {
    fn mode(&self) -> PlaybackMode;

    /// Handle one inbound chunk. Errors describe the dropped chunk only.
    fn on_chunk(&mut self, chunk: Bytes) -> Result<(), Error>;

    /// Explicit play request
    fn play(&mut self) -> Result<PlayOutcome, PlaybackError>;

    /// Forget connection-scoped state
    fn reset(&mut self);

    /// Release the playback engine
    fn release(&mut self);

    fn stats(&self) -> ReconstructorStats;
}

/// Reconstructor for the configured mode
pub fn reconstructor_for(mode: PlaybackMode, engine: Arc<dyn PlaybackEngine>) -> Box<dyn PlaybackReconstructor> {
    match mode {
        PlaybackMode::Streaming => Box::new(StreamingReconstructor::new(engine)),
        PlaybackMode::Buffered => Box::new(BufferedReconstructor::new(engine)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Engine that records submissions
    #[derive(Default)]
    pub struct RecordingEngine {
        pub units: Mutex<Vec<AudioFrame>>,
        pub containers: Mutex<Vec<Bytes>>,
        pub refuse: AtomicBool,
        pub releases: AtomicUsize,
    }

    impl PlaybackEngine for RecordingEngine {
        fn play_unit(&self, unit: AudioFrame) -> Result<(), PlaybackError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(PlaybackError::Rejected("refused".into()));
            }
            self.units.lock().push(unit);
            Ok(())
        }

        fn play_container(&self, container: Bytes) -> Result<(), PlaybackError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(PlaybackError::Rejected("refused".into()));
            }
            self.containers.lock().push(container);
            Ok(())
        }

        fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
