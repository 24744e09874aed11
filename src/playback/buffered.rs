//! Whole-clip playback
//!
//! Raw chunks are kept as they arrive; a play request wraps everything
//! received so far in one WAV container and submits it once.

use bytes::Bytes;
use std::sync::Arc;

use crate::codec::wav::{self, WavFormat};
use crate::config::PlaybackMode;
use crate::constants::TARGET_SAMPLE_RATE;
use crate::error::{CodecError, Error, PlaybackError};
use crate::playback::{PlayOutcome, PlaybackEngine, PlaybackReconstructor, ReconstructorStats};

/// Chunks of one connection, in arrival order
#[derive(Debug, Default, Clone)]
pub struct PlaybackBuffer {
    chunks: Vec<Bytes>,
    total_len: usize,
}

impl PlaybackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Bytes) {
        self.total_len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Sum of all chunk lengths in bytes
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_len = 0;
    }

    /// Header plus every chunk
    pub fn assemble(&self, format: WavFormat) -> Result<Bytes, CodecError> {
        wav::assemble(format, self.chunks.iter().map(|c| &c[..]))
    }
}

pub struct BufferedReconstructor {
    engine: Arc<dyn PlaybackEngine>,
    buffer: PlaybackBuffer,
    format: WavFormat,
    stats: ReconstructorStats,
}

impl BufferedReconstructor {
    pub fn new(engine: Arc<dyn PlaybackEngine>) -> Self {
        Self {
            engine,
            buffer: PlaybackBuffer::new(),
            format: WavFormat::mono(TARGET_SAMPLE_RATE),
            stats: ReconstructorStats::default(),
        }
    }

    pub fn buffer(&self) -> &PlaybackBuffer {
        &self.buffer
    }

    /// The container a play request would submit
    pub fn assemble(&self) -> Result<Bytes, CodecError> {
        self.buffer.assemble(self.format)
    }
}

impl PlaybackReconstructor for BufferedReconstructor {
    fn mode(&self) -> PlaybackMode {
        PlaybackMode::Buffered
    }

    fn on_chunk(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.stats.chunks_received += 1;
        self.stats.bytes_received += chunk.len() as u64;

        if chunk.is_empty() {
            tracing::debug!("Ignoring empty chunk");
            return Ok(());
        }
        // An odd chunk would shift every later sample by one byte
        if chunk.len() % 2 != 0 {
            self.stats.malformed += 1;
            tracing::warn!("Skipping odd-length chunk of {} bytes", chunk.len());
            return Err(CodecError::MalformedFrame(chunk.len()).into());
        }

        let len = chunk.len();
        self.buffer.push(chunk);
        tracing::debug!(
            "Buffered chunk of {} bytes ({} chunks, {} bytes total)",
            len,
            self.buffer.chunk_count(),
            self.buffer.total_len()
        );
        Ok(())
    }

    fn play(&mut self) -> Result<PlayOutcome, PlaybackError> {
        if self.buffer.total_len() == 0 {
            tracing::info!("No buffered audio to play");
            return Ok(PlayOutcome::NoBufferedData);
        }

        let container = self.assemble().map_err(|e| {
            self.stats.rejected += 1;
            PlaybackError::Rejected(e.to_string())
        })?;
        let bytes = container.len();

        if let Err(e) = self.engine.play_container(container) {
            self.stats.rejected += 1;
            tracing::warn!("Engine refused {} byte clip: {}", bytes, e);
            return Err(e);
        }

        self.stats.submitted += 1;
        tracing::info!(
            "Playing buffered clip: {} chunks, {} bytes",
            self.buffer.chunk_count(),
            bytes
        );
        Ok(PlayOutcome::Played { bytes })
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn release(&mut self) {
        self.engine.release();
    }

    fn stats(&self) -> ReconstructorStats {
        self.stats
    }
}
